use lazy_static::lazy_static;
use mm_hierarchy::{EntityDecl, Hierarchy};

pub const ENTITY: &str = "entity";
pub const PERSON: &str = "person";
pub const PUPIL: &str = "pupil";
pub const TEACHER: &str = "teacher";
pub const PET: &str = "pet";

/// `(name, parent, description)` for every concept, in presentation order.
const TAXONOMY: &[(&str, Option<&str>, &str)] = &[
    (ENTITY, None, "A general entity with no specific type."),
    (PERSON, Some(ENTITY), "A person, can be a pupil or teacher."),
    (PUPIL, Some(PERSON), "A person who is a pupil."),
    (TEACHER, Some(PERSON), "A person who is a teacher."),
    (PET, Some(ENTITY), "An entity that is a pet."),
];

lazy_static! {
    /// The concepts records get classified into
    pub static ref CONCEPTS: Hierarchy = Hierarchy::build(TAXONOMY.iter().map(
        |&(name, parent, description)| {
            let entity = EntityDecl::new(name).with_description(description);
            match parent {
                Some(parent) => entity.with_parent(parent),
                None => entity,
            }
        }
    ))
    .expect("Built-in taxonomy has a name for every concept");
}

/// The concept taxonomy shared by all samples.
pub fn concepts() -> &'static Hierarchy {
    &CONCEPTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_is_rooted_at_entity() {
        let roots: Vec<_> = concepts().roots().map(|record| record.name()).collect();
        assert_eq!(roots, [ENTITY]);
        assert_eq!(concepts().children_of(ENTITY), [PERSON, PET]);
        assert_eq!(concepts().children_of(PERSON), [PUPIL, TEACHER]);
        assert_eq!(concepts().depth(TEACHER), 2);
    }

    #[test]
    fn every_concept_is_described() {
        assert_eq!(concepts().len(), TAXONOMY.len());
        assert_eq!(
            concepts().get(PET).and_then(|record| record.description()),
            Some("An entity that is a pet.")
        );
        assert!(concepts().records().all(|record| record.description().is_some()));
    }
}
