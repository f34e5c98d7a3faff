//! Integration test: discriminator-driven type resolution
//!
//! Covers affix stripping, the subtype table, fallback to concrete declared
//! types, and the order in which conventions apply to undeclared nodes.

use objmap_mapping::{
    Error, MapperConfig, MappingRule, ModelValue, ObjectMapper, TypeDescriptor, TypeRegistry,
    TypeSpec, Value,
};
use serde_json::json;

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn person_mapper() -> ObjectMapper {
    let mut registry = TypeRegistry::new();
    registry
        .register_type(TypeDescriptor::new("Person").field("name", TypeSpec::string()))
        .register_rule("Person", MappingRule::typed("firstName", "name", None).unwrap())
        .register_subtype("Person", "Person");

    let config = MapperConfig::default()
        .with_class_name_key("type")
        .with_class_affixes(&[""], &["Impl"]);
    ObjectMapper::with_config(registry, config).unwrap()
}

fn zoo_mapper() -> ObjectMapper {
    let mut registry = TypeRegistry::new();
    registry
        .register_type(TypeDescriptor::abstract_type("Animal").field("name", TypeSpec::string()))
        .register_type(
            TypeDescriptor::new("Dog")
                .field("name", TypeSpec::string())
                .optional_field("barks", TypeSpec::bool()),
        )
        .register_type(
            TypeDescriptor::new("Cat")
                .field("name", TypeSpec::string())
                .optional_field("lives", TypeSpec::int()),
        )
        .register_type(TypeDescriptor::new("Pet").field("name", TypeSpec::string()))
        .register_type(
            TypeDescriptor::new("Zoo")
                .field("animals", TypeSpec::list(TypeSpec::polymorphic("Animal")))
                .optional_field("pets", TypeSpec::Inferred)
                .optional_field("misc", TypeSpec::Inferred),
        )
        .register_subtype("Dog", "Dog")
        .register_subtype("Cat", "Cat");
    ObjectMapper::new(registry)
}

#[test]
fn test_discriminator_with_suffix_resolves_registered_type() -> anyhow::Result<()> {
    let mapper = person_mapper();
    let person = mapper
        .map_dynamic("Person", &v(json!({"firstName": "Jane", "type": "PersonImpl"})))?
        .expect("non-null input");

    assert_eq!(person.type_name(), "Person");
    assert_eq!(person.required::<String>("name")?, "Jane");
    Ok(())
}

#[test]
fn test_unregistered_discriminator_on_abstract_base() {
    let mapper = zoo_mapper();
    let err = mapper
        .map_dynamic("Animal", &v(json!({"javaClass": "com.zoo.RobotImpl", "name": "R2"})))
        .unwrap_err();

    assert!(matches!(err, Error::UnresolvedType { .. }));
    assert!(err.to_string().contains("'Robot'"));
}

#[test]
fn test_unregistered_discriminator_falls_back_to_concrete_base() {
    let mapper = person_mapper();
    let person = mapper
        .map_dynamic("Person", &v(json!({"firstName": "Jane", "type": "RobotImpl"})))
        .unwrap()
        .unwrap();
    assert_eq!(person.type_name(), "Person");
}

#[test]
fn test_abstract_type_resolved_through_plain_map() {
    let mapper = zoo_mapper();
    let dog = mapper
        .map("Animal", &v(json!({"javaClass": "com.zoo.DogImpl", "name": "Rex", "barks": "true"})))
        .unwrap()
        .unwrap();

    assert_eq!(dog.type_name(), "Dog");
    assert_eq!(dog.get("barks"), Some(&ModelValue::Bool(true)));
}

#[test]
fn test_polymorphic_list_elements() {
    let mapper = zoo_mapper();
    let zoo = mapper
        .map(
            "Zoo",
            &v(json!({
                "animals": [
                    {"javaClass": "com.zoo.DogImpl", "name": "Rex", "barks": true},
                    {"javaClass": "com.zoo.CatImpl", "name": "Tom", "lives": 9}
                ]
            })),
        )
        .unwrap()
        .unwrap();

    let animals = zoo.get("animals").and_then(ModelValue::as_elements).unwrap();
    let types: Vec<&str> = animals
        .iter()
        .filter_map(ModelValue::as_object)
        .map(|animal| animal.type_name())
        .collect();
    assert_eq!(types, vec!["Dog", "Cat"]);
}

#[test]
fn test_polymorphic_list_element_error_path() {
    let mapper = zoo_mapper();
    let err = mapper
        .map(
            "Zoo",
            &v(json!({
                "animals": [
                    {"javaClass": "com.zoo.DogImpl", "name": "Rex"},
                    {"javaClass": "com.zoo.CatImpl", "lives": 9}
                ]
            })),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "animals[1].name: missing required field");
}

#[test]
fn test_precedence_for_undeclared_nodes() {
    let mapper = zoo_mapper();
    let zoo = mapper
        .map(
            "Zoo",
            &v(json!({
                "animals": [],
                "pets": {
                    "javaClass": "java.util.ArrayList",
                    "list": [
                        {"javaClass": "DogImpl", "name": "Rex"},
                        {"name": "Goldie"}
                    ]
                },
                "misc": {"name": "not a pet"}
            })),
        )
        .unwrap()
        .unwrap();

    // Wrapper unwrapped, then discriminator, then key-name inference
    let pets = zoo.get("pets").and_then(ModelValue::as_elements).unwrap();
    assert_eq!(pets[0].as_object().map(|o| o.type_name()), Some("Dog"));
    assert_eq!(pets[1].as_object().map(|o| o.type_name()), Some("Pet"));

    // Nothing applies: structural lift
    assert!(matches!(zoo.get("misc"), Some(ModelValue::Map(_))));
}
