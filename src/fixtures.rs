//! Snapshot builders shared by unit tests.

use uuid::Uuid;

use crate::models::{AccountStatus, Gender, Person, PersonAttributes, PersonId, UserId};

pub(crate) fn pid(n: u128) -> PersonId {
    PersonId(Uuid::from_u128(n))
}

#[derive(Default)]
pub(crate) struct FamilyBuilder {
    people: Vec<Person>,
}

impl FamilyBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn person(&mut self, name: &str) -> PersonId {
        let id = pid(self.people.len() as u128 + 1);
        self.people
            .push(Person::new(id, Gender::Other, PersonAttributes::named(name)));
        id
    }

    fn get_mut(&mut self, id: PersonId) -> &mut Person {
        self.people
            .iter_mut()
            .find(|person| person.id == id)
            .expect("fixture person should exist")
    }

    pub(crate) fn parent_child(&mut self, parent: PersonId, child: PersonId) -> &mut Self {
        self.get_mut(parent).children.push(child);
        self.get_mut(child).parents.push(parent);
        self
    }

    pub(crate) fn spouses(&mut self, a: PersonId, b: PersonId) -> &mut Self {
        self.get_mut(a).spouses.push(b);
        self.get_mut(b).spouses.push(a);
        self
    }

    pub(crate) fn account(&mut self, id: PersonId, status: AccountStatus, owner: Option<UserId>) -> &mut Self {
        let person = self.get_mut(id);
        person.attributes.account_status = status;
        person.attributes.owner_user_id = owner;
        self
    }

    pub(crate) fn build(&self) -> Vec<Person> {
        self.people.clone()
    }
}

/// Grandparents, two parents, two children and a grandchild under the first child.
pub(crate) struct ThreeGenerations {
    pub people: Vec<Person>,
    pub grandpa: PersonId,
    pub grandma: PersonId,
    pub father: PersonId,
    pub mother: PersonId,
    pub son: PersonId,
    pub daughter: PersonId,
    pub grandson: PersonId,
}

pub(crate) fn three_generations() -> ThreeGenerations {
    let mut family = FamilyBuilder::new();
    let grandpa = family.person("Grandpa");
    let grandma = family.person("Grandma");
    let father = family.person("Father");
    let mother = family.person("Mother");
    let son = family.person("Son");
    let daughter = family.person("Daughter");
    let grandson = family.person("Grandson");

    family
        .spouses(grandpa, grandma)
        .parent_child(grandpa, father)
        .parent_child(grandma, father)
        .spouses(father, mother)
        .parent_child(father, son)
        .parent_child(mother, son)
        .parent_child(father, daughter)
        .parent_child(mother, daughter)
        .parent_child(son, grandson);

    ThreeGenerations {
        people: family.build(),
        grandpa,
        grandma,
        father,
        mother,
        son,
        daughter,
        grandson,
    }
}
