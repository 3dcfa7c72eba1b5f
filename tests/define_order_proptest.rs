use proptest::prelude::*;

use typegraph::pattern::{RolePlayer, ThingVariable};
use typegraph::{Bindings, GraphEngine, Label, TypeDeclaration, ValueKind};

fn declarations() -> Vec<TypeDeclaration> {
    vec![
        TypeDeclaration::new("living").sub("entity").set_abstract(),
        TypeDeclaration::new("person")
            .sub("living")
            .owns("name")
            .plays("employment:employee"),
        TypeDeclaration::new("employee").sub("person").owns("badge"),
        TypeDeclaration::new("company")
            .sub("entity")
            .owns("name")
            .plays("employment:employer"),
        TypeDeclaration::new("name")
            .sub("attribute")
            .value_kind(ValueKind::String),
        TypeDeclaration::new("badge").sub("name"),
        TypeDeclaration::new("employment")
            .sub("relation")
            .relates("employee")
            .relates("employer"),
        TypeDeclaration::new("contract")
            .sub("employment")
            .relates_as("contractor", "employee"),
    ]
}

fn snapshot(engine: &GraphEngine) -> Vec<(String, Vec<String>)> {
    let mut out = Vec::new();
    for label in [
        "living", "person", "employee", "company", "name", "badge", "employment", "contract",
    ] {
        let chain = engine
            .supertypes(&Label::new(label))
            .unwrap()
            .iter()
            .map(|t| t.label.to_string())
            .collect();
        out.push((label.to_string(), chain));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn definition_order_does_not_matter(order in Just(declarations()).prop_shuffle()) {
        let reference = GraphEngine::in_memory();
        reference.define_schema(&declarations(), &[]).unwrap();

        let shuffled = GraphEngine::in_memory();
        shuffled.define_schema(&order, &[]).unwrap();

        prop_assert_eq!(snapshot(&reference), snapshot(&shuffled));
        let badge = shuffled.get_type(&Label::new("badge")).unwrap().unwrap();
        prop_assert_eq!(badge.value_kind, Some(ValueKind::String));

        let mut roles: Vec<String> = shuffled
            .get_relates(&Label::new("contract"))
            .unwrap()
            .iter()
            .map(|r| r.label.to_string())
            .collect();
        roles.sort();
        prop_assert_eq!(roles, vec!["contract:contractor".to_string(), "employment:employer".to_string()]);

        // The shuffled schema accepts data.
        let bindings = shuffled
            .insert_data(
                &[ThingVariable::named("job").isa("employment").relation(vec![
                    RolePlayer::new(
                        ThingVariable::named("e")
                            .isa("employee")
                            .has(ThingVariable::anonymous().isa("badge").value("B-7")),
                    ),
                    RolePlayer::new(ThingVariable::named("c").isa("company")),
                ])],
                &Bindings::new(),
            )
            .unwrap();
        prop_assert_eq!(bindings.len(), 3);
    }
}
