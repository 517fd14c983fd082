use std::collections::{HashMap, HashSet};

use anyhow::anyhow;

use crate::error::{LibError, Result};
use crate::models::{KinshipViolation, Person, PersonId};

pub const MAX_PARENTS: usize = 2;

pub fn kinship_violations(people: &[Person]) -> Vec<KinshipViolation> {
    let mut lookup: HashMap<PersonId, &Person> = HashMap::with_capacity(people.len());
    let mut violations = Vec::new();
    for person in people {
        if lookup.insert(person.id, person).is_some() {
            violations.push(KinshipViolation::DuplicatePersonId {
                person_id: person.id,
            });
        }
    }

    for person in people {
        let lists = [
            &person.parents,
            &person.children,
            &person.spouses,
            &person.siblings,
        ];
        let mut self_reported = false;
        for list in lists {
            let mut seen = HashSet::with_capacity(list.len());
            for relative in list {
                if *relative == person.id {
                    if !self_reported {
                        violations.push(KinshipViolation::SelfReference {
                            person_id: person.id,
                        });
                        self_reported = true;
                    }
                    continue;
                }
                if !seen.insert(*relative) {
                    violations.push(KinshipViolation::DuplicateRelative {
                        person_id: person.id,
                        relative_id: *relative,
                    });
                }
                if !lookup.contains_key(relative) {
                    violations.push(KinshipViolation::UnknownRelative {
                        person_id: person.id,
                        missing_id: *relative,
                    });
                }
            }
        }

        if person.parents.len() > MAX_PARENTS {
            violations.push(KinshipViolation::TooManyParents {
                person_id: person.id,
                parent_count: person.parents.len(),
            });
        }

        // Each direction is checked from its own side so a one-sided link is reported once.
        for child_id in &person.children {
            if let Some(child) = lookup.get(child_id) {
                if child.id != person.id && !child.parents.contains(&person.id) {
                    violations.push(KinshipViolation::AsymmetricParentChild {
                        parent_id: person.id,
                        child_id: child.id,
                    });
                }
            }
        }
        for parent_id in &person.parents {
            if let Some(parent) = lookup.get(parent_id) {
                if parent.id != person.id && !parent.children.contains(&person.id) {
                    violations.push(KinshipViolation::AsymmetricParentChild {
                        parent_id: parent.id,
                        child_id: person.id,
                    });
                }
            }
        }
        for spouse_id in &person.spouses {
            if let Some(spouse) = lookup.get(spouse_id) {
                if spouse.id != person.id && !spouse.spouses.contains(&person.id) {
                    violations.push(KinshipViolation::AsymmetricSpouse {
                        person_id: person.id,
                        spouse_id: spouse.id,
                    });
                }
            }
        }
    }

    violations
}

pub fn ensure_kinship_invariants(people: &[Person]) -> Result<()> {
    let violations = kinship_violations(people);
    if let Some(first) = violations.first() {
        return Err(LibError::invalid_with_code(
            first.error_code(),
            first.public_message(),
            anyhow!("kinship snapshot validation failed: {:?}", violations),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FamilyBuilder, pid, three_generations};

    #[test]
    fn consistent_family_has_no_violations() {
        let family = three_generations();
        assert!(kinship_violations(&family.people).is_empty());
        assert!(ensure_kinship_invariants(&family.people).is_ok());
    }

    #[test]
    fn one_sided_child_link_is_reported() {
        let mut family = FamilyBuilder::new();
        let parent = family.person("P");
        let child = family.person("C");
        let mut people = family.build();
        people[0].children.push(child);

        let violations = kinship_violations(&people);
        assert_eq!(
            violations,
            vec![KinshipViolation::AsymmetricParentChild {
                parent_id: parent,
                child_id: child,
            }]
        );
    }

    #[test]
    fn one_sided_parent_link_is_reported_from_child_side() {
        let mut family = FamilyBuilder::new();
        let parent = family.person("P");
        let child = family.person("C");
        let mut people = family.build();
        people[1].parents.push(parent);

        assert!(kinship_violations(&people).iter().any(|v| matches!(
            v,
            KinshipViolation::AsymmetricParentChild { parent_id, child_id }
                if *parent_id == parent && *child_id == child
        )));
    }

    #[test]
    fn one_sided_spouse_link_is_reported() {
        let mut family = FamilyBuilder::new();
        let a = family.person("A");
        let b = family.person("B");
        let mut people = family.build();
        people[0].spouses.push(b);

        let err = ensure_kinship_invariants(&people).expect_err("asymmetric spouse should fail");
        assert_eq!(err.code, "kinship_asymmetric_spouse");
        assert!(kinship_violations(&people).iter().any(|v| matches!(
            v,
            KinshipViolation::AsymmetricSpouse { person_id, spouse_id }
                if *person_id == a && *spouse_id == b
        )));
    }

    #[test]
    fn self_reference_is_reported_once() {
        let mut family = FamilyBuilder::new();
        let a = family.person("A");
        let mut people = family.build();
        people[0].spouses.push(a);
        people[0].siblings.push(a);

        let violations = kinship_violations(&people);
        assert_eq!(violations, vec![KinshipViolation::SelfReference { person_id: a }]);
    }

    #[test]
    fn duplicate_and_dangling_relatives_are_reported() {
        let mut family = FamilyBuilder::new();
        let a = family.person("A");
        let b = family.person("B");
        family.spouses(a, b);
        let mut people = family.build();
        people[0].spouses.push(b);
        let missing = pid(99);
        people[1].siblings.push(missing);

        let violations = kinship_violations(&people);
        assert!(violations.contains(&KinshipViolation::DuplicateRelative {
            person_id: a,
            relative_id: b,
        }));
        assert!(violations.contains(&KinshipViolation::UnknownRelative {
            person_id: b,
            missing_id: missing,
        }));
    }

    #[test]
    fn third_parent_is_reported() {
        let mut family = FamilyBuilder::new();
        let child = family.person("C");
        for name in ["P1", "P2", "P3"] {
            let parent = family.person(name);
            family.parent_child(parent, child);
        }

        let err = ensure_kinship_invariants(&family.build()).expect_err("three parents should fail");
        assert_eq!(err.code, "kinship_too_many_parents");
    }

    #[test]
    fn duplicate_person_ids_are_reported() {
        let mut family = FamilyBuilder::new();
        let a = family.person("A");
        let mut people = family.build();
        people.push(people[0].clone());

        assert_eq!(
            kinship_violations(&people),
            vec![KinshipViolation::DuplicatePersonId { person_id: a }]
        );
    }
}
