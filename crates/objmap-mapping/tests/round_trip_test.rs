//! Integration test: typed models, foreign encodings and map -> unmap
//!
//! An order payload in the shape a Java backend emits it: class-tagged big
//! integers, timestamps and collection wrappers.

use chrono::{DateTime, Utc};
use objmap_mapping::{
    KeyCase, LargeInteger, MapperConfig, Model, ModelObject, ModelValue, ObjectMapper,
    TypeDescriptor, TypeRegistry, TypeSpec, Value,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
struct OrderLine {
    sku: String,
    quantity: i64,
}

impl Model for OrderLine {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("OrderLine")
            .field("sku", TypeSpec::string())
            .field("quantity", TypeSpec::int())
    }

    fn from_object(object: &ModelObject) -> objmap_mapping::Result<Self> {
        Ok(Self {
            sku: object.required("sku")?,
            quantity: object.required("quantity")?,
        })
    }

    fn to_object(&self) -> ModelObject {
        ModelObject::new("OrderLine")
            .with("sku", self.sku.as_str())
            .with("quantity", self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: LargeInteger,
    placed_at: DateTime<Utc>,
    tags: Vec<String>,
    lines: Vec<OrderLine>,
    priority: Option<i64>,
}

impl Model for Order {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Order")
            .field("id", TypeSpec::large_int())
            .field("placedAt", TypeSpec::instant())
            .field("tags", TypeSpec::set(TypeSpec::string()))
            .field("lines", TypeSpec::list(TypeSpec::object("OrderLine")))
            .optional_field("priority", TypeSpec::int())
    }

    fn from_object(object: &ModelObject) -> objmap_mapping::Result<Self> {
        Ok(Self {
            id: object.required("id")?,
            placed_at: object.required("placedAt")?,
            tags: object.required("tags")?,
            lines: object.models("lines")?,
            priority: object.optional("priority")?,
        })
    }

    fn to_object(&self) -> ModelObject {
        ModelObject::new("Order")
            .with("id", self.id.clone())
            .with("placedAt", self.placed_at)
            .with(
                "tags",
                ModelValue::Set(self.tags.iter().map(|t| ModelValue::String(t.clone())).collect()),
            )
            .with(
                "lines",
                ModelValue::List(
                    self.lines
                        .iter()
                        .map(|line| ModelValue::Object(line.to_object()))
                        .collect(),
                ),
            )
            .with_optional("priority", self.priority)
    }
}

fn order_mapper() -> ObjectMapper {
    let mut registry = TypeRegistry::new();
    registry
        .register_model::<Order>()
        .register_model::<OrderLine>();
    ObjectMapper::new(registry)
}

fn java_order() -> Value {
    Value::from(json!({
        "id": {"javaClass": "java.math.BigInteger", "value": "98765432109876543210"},
        "placedAt": {
            "javaClass": "java.sql.Timestamp",
            "time": 1_700_000_000_123_i64,
            "nanos": 123_456_789
        },
        "tags": {"javaClass": "java.util.HashSet", "set": ["rush", "gift", "rush"]},
        "lines": {
            "javaClass": "java.util.ArrayList",
            "list": [
                {"sku": "A-1", "quantity": "2"},
                {"sku": "B-2", "quantity": 1.0}
            ]
        },
        "priority": "high"
    }))
}

#[test]
fn test_map_into_model_from_java_payload() -> anyhow::Result<()> {
    let mapper = order_mapper();
    let order: Order = mapper.map_into(&java_order())?.expect("non-null input");

    assert_eq!(order.id.as_str(), "98765432109876543210");
    assert_eq!(order.placed_at.timestamp(), 1_700_000_000);
    assert_eq!(order.placed_at.timestamp_subsec_nanos(), 123_456_789);
    assert_eq!(order.tags, vec!["rush", "gift"]);
    assert_eq!(
        order.lines,
        vec![
            OrderLine {
                sku: "A-1".to_string(),
                quantity: 2
            },
            OrderLine {
                sku: "B-2".to_string(),
                quantity: 1
            },
        ]
    );
    // Unconvertible optional value is left unset
    assert_eq!(order.priority, None);
    Ok(())
}

#[test]
fn test_model_survives_unmap_and_remap() -> anyhow::Result<()> {
    let mapper = order_mapper();
    let order: Order = mapper.map_into(&java_order())?.expect("non-null input");

    let lowered = mapper.unmap_model(&order)?;
    assert_eq!(
        lowered.get("id"),
        Some(&Value::from("98765432109876543210"))
    );
    assert_eq!(
        lowered.get("placedAt"),
        Some(&Value::from("2023-11-14T22:13:20.123456789Z"))
    );

    let again: Order = mapper.map_into(&lowered)?.expect("non-null input");
    assert_eq!(again, order);
    Ok(())
}

#[test]
fn test_map_then_unmap_reproduces_keys() -> anyhow::Result<()> {
    let mut registry = TypeRegistry::new();
    registry
        .register_type(
            TypeDescriptor::new("Customer")
                .field("customerId", TypeSpec::int())
                .field("displayName", TypeSpec::string())
                .optional_field("homeAddress", TypeSpec::object("Address"))
                .optional_field("labels", TypeSpec::sorted_map(TypeSpec::string())),
        )
        .register_type(
            TypeDescriptor::new("Address")
                .field("streetLine", TypeSpec::string())
                .field("postalCode", TypeSpec::int()),
        );
    let config = MapperConfig::default().with_key_case(KeyCase::SnakeCase);
    let mapper = ObjectMapper::with_config(registry, config)?;

    let source = Value::from(json!({
        "customer_id": 7,
        "display_name": "Jane",
        "home_address": {"street_line": "1 Main St", "postal_code": 12345},
        "labels": {"tier": "gold", "region": "eu"}
    }));
    let customer = mapper.map("Customer", &source)?.expect("non-null input");
    assert_eq!(mapper.unmap(&customer)?, source);
    Ok(())
}

#[test]
fn test_large_integer_digits_beyond_64_bits() {
    let mapper = ObjectMapper::new(TypeRegistry::new());
    let digits = "-340282366920938463463374607431768211457";

    let mapped = mapper
        .map_value(&TypeSpec::large_int(), &Value::from(digits))
        .unwrap();
    let ModelValue::LargeInt(big) = &mapped else {
        panic!("expected large integer, got {mapped:?}");
    };
    assert_eq!(big.as_str(), digits);
    assert!(big.is_negative());
}

#[test]
fn test_set_resolution_properties() {
    let mapper = ObjectMapper::new(TypeRegistry::new());
    let input = Value::from(json!([5, 3, 5, 1, 3, 5]));

    let ModelValue::Set(items) = mapper
        .map_value(&TypeSpec::set(TypeSpec::int()), &input)
        .unwrap()
    else {
        panic!("expected set");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(
        items,
        vec![ModelValue::Int(5), ModelValue::Int(3), ModelValue::Int(1)]
    );
}

#[test]
fn test_nested_required_error_message() {
    let mut registry = TypeRegistry::new();
    registry
        .register_type(
            TypeDescriptor::new("Shipment").field("address", TypeSpec::object("Address")),
        )
        .register_type(
            TypeDescriptor::new("Address")
                .field("street", TypeSpec::string())
                .field("postalCode", TypeSpec::int()),
        );
    let mapper = ObjectMapper::new(registry);

    let err = mapper
        .map(
            "Shipment",
            &Value::from(json!({"address": {"street": "Main", "postalCode": "N/A"}})),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "address.postalCode: expected integer, got string 'N/A'"
    );
}
