use std::collections::{HashMap, HashSet};

use anyhow::anyhow;

use crate::algorithms;
use crate::error::{LibError, Result};
use crate::invariants;
use crate::models::{Degree, KinshipViolation, Person, PersonId};

/// Immutable arena over one fetched snapshot. Relatives are stored as ids, never as references.
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    people: Vec<Person>,
    index: HashMap<PersonId, usize>,
}

impl FamilyGraph {
    /// Builds the arena, rejecting only duplicate ids. Other inconsistencies are tolerated and
    /// reported through [`FamilyGraph::violations`].
    pub fn new(people: Vec<Person>) -> Result<Self> {
        let mut index = HashMap::with_capacity(people.len());
        for (slot, person) in people.iter().enumerate() {
            if index.insert(person.id, slot).is_some() {
                return Err(LibError::invalid_with_code(
                    "kinship_duplicate_person",
                    "Person IDs must be unique within a tree",
                    anyhow!("duplicate person id {}", person.id),
                ));
            }
        }
        Ok(Self { people, index })
    }

    /// Builds the arena and requires every kinship invariant to hold.
    pub fn validated(people: Vec<Person>) -> Result<Self> {
        invariants::ensure_kinship_invariants(&people)?;
        Self::new(people)
    }

    pub fn violations(&self) -> Vec<KinshipViolation> {
        invariants::kinship_violations(&self.people)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn into_people(self) -> Vec<Person> {
        self.people
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.index.get(&id).map(|slot| &self.people[*slot])
    }

    pub fn find(&self, id: PersonId) -> Result<&Person> {
        self.get(id).ok_or_else(|| {
            LibError::not_found("Person not found in family tree", anyhow!("person {}", id))
        })
    }

    /// Snapshot position of a person, used as the deterministic tie-breaker.
    pub fn slot(&self, id: PersonId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Known parents: the stored list plus anyone who lists this person as a child.
    pub fn parents_of(&self, id: PersonId) -> Vec<PersonId> {
        self.linked(id, |person| &person.parents, |other| &other.children)
    }

    /// Known children: the stored list plus anyone who lists this person as a parent.
    pub fn children_of(&self, id: PersonId) -> Vec<PersonId> {
        self.linked(id, |person| &person.children, |other| &other.parents)
    }

    pub fn spouses_of(&self, id: PersonId) -> Vec<PersonId> {
        self.linked(id, |person| &person.spouses, |other| &other.spouses)
    }

    /// Stored siblings plus every other child of this person's parents.
    pub fn siblings(&self, id: PersonId) -> Result<Vec<PersonId>> {
        let person = self.find(id)?;
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut siblings = Vec::new();
        let derived = self
            .parents_of(id)
            .into_iter()
            .flat_map(|parent| self.children_of(parent));
        for sibling in person.siblings.iter().copied().chain(derived) {
            if self.contains(sibling) && seen.insert(sibling) {
                siblings.push(sibling);
            }
        }
        Ok(siblings)
    }

    pub fn degree(&self, id: PersonId) -> Result<Degree> {
        self.find(id)?;
        Ok(Degree {
            parents: self.parents_of(id).len(),
            children: self.children_of(id).len(),
            spouses: self.spouses_of(id).len(),
        })
    }

    /// True when the person has no descendants at any depth.
    pub fn is_leaf(&self, id: PersonId) -> Result<bool> {
        self.find(id)?;
        Ok(algorithms::descendants(self, id).is_empty())
    }

    fn linked(
        &self,
        id: PersonId,
        forward: impl Fn(&Person) -> &Vec<PersonId>,
        backward: impl Fn(&Person) -> &Vec<PersonId>,
    ) -> Vec<PersonId> {
        let Some(person) = self.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for relative in forward(person) {
            if *relative != id && self.contains(*relative) && seen.insert(*relative) {
                out.push(*relative);
            }
        }
        for other in &self.people {
            if other.id != id && backward(other).contains(&id) && seen.insert(other.id) {
                out.push(other.id);
            }
        }
        out
    }
}
