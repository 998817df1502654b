//! Unit tests for edm-core

use crate::test_utils::{SalesFixture, sales_registry};
use crate::*;

fn customer_type(registry: &mut Registry, model: ModelId) -> TypeId {
    StructuredTypeBuilder::entity("Customer", "app::Customer")
        .property(PropertyBuilder::primitive("Id", PrimitiveType::Int32))
        .build(registry, model)
        .unwrap()
}

#[test]
fn test_valid_names_are_accepted() {
    let mut registry = Registry::new();
    let model = registry.add_model("Sales").unwrap();
    let customer = customer_type(&mut registry, model);

    for name in ["Customers", "customers_2024", "_", "A1_b2"] {
        let container = registry.add_container(name, model, None).unwrap();
        let set = EntitySet::new(name, customer).unwrap();
        registry.add_entity_set(container, set).unwrap();
        let field = FieldRef::new("app::Customer", name);
        assert!(ResourcePropertyDescription::primitive(name, field, PrimitiveType::String, false, true).is_ok());
    }
}

#[test]
fn test_illegal_names_are_rejected() {
    let mut registry = Registry::new();
    let model = registry.add_model("Sales").unwrap();
    let customer = customer_type(&mut registry, model);

    for name in ["foo-bar", "foo.bar", "foo bar", "", "naïve"] {
        let err = registry.add_container(name, model, None).unwrap_err();
        assert_eq!(
            err,
            EdmError::IllegalName {
                construct: NamedConstruct::EntityContainer,
                name: name.to_string(),
            }
        );

        let err = EntitySet::new(name, customer).unwrap_err();
        assert!(matches!(err, EdmError::IllegalName { construct: NamedConstruct::EntitySet, .. }));

        let field = FieldRef::new("app::Customer", "id");
        let err = ResourcePropertyDescription::primitive(name, field, PrimitiveType::String, false, true)
            .unwrap_err();
        assert!(matches!(
            err,
            EdmError::IllegalName { construct: NamedConstruct::PropertyDescription, .. }
        ));
    }
}

#[test]
fn test_illegal_name_message() {
    let err = validate_name(NamedConstruct::EntityContainer, "foo-bar").unwrap_err();
    assert_eq!(
        err.to_string(),
        "\"foo-bar\" is an illegal name for an entity container. The name for an entity container may only contain alphanumeric characters and underscores"
    );
}

#[test]
fn test_namespace_validation() {
    assert!(validate_namespace("").is_ok());
    assert!(validate_namespace("Sales").is_ok());
    assert!(validate_namespace("Company.Sales_2").is_ok());
    assert!(validate_namespace("Company..Sales").is_err());
    assert!(validate_namespace(".Sales").is_err());
    assert!(validate_namespace("Sales-Dept").is_err());

    let mut registry = Registry::new();
    registry.add_model("Sales").unwrap();
    assert_eq!(
        registry.add_model("Sales").unwrap_err(),
        EdmError::DuplicateNamespace("Sales".to_string())
    );
}

#[test]
fn test_duplicate_entity_set_in_same_container() {
    let SalesFixture {
        mut registry,
        main,
        customer,
        ..
    } = sales_registry();

    let err = registry
        .add_entity_set(main, EntitySet::new("Customers", customer).unwrap())
        .unwrap_err();
    assert_eq!(
        err,
        EdmError::DuplicateEntitySet {
            set: "Customers".to_string(),
            container: "Sales.Main".to_string(),
        }
    );
    assert_eq!(registry.entity_sets(main).len(), 2);
}

#[test]
fn test_add_entity_set_assigns_container() {
    let fixture = sales_registry();
    let registry = &fixture.registry;

    let set = registry.own_entity_set(fixture.main, "Customers").unwrap();
    assert_eq!(registry.container_of(set), Some(fixture.main));
    assert_eq!(registry.entity_set(set).unwrap().entity_type(), fixture.customer);
}

#[test]
fn test_entity_set_resolves_through_parent() {
    let mut registry = Registry::new();
    let model = registry.add_model("Sales").unwrap();
    let customer = customer_type(&mut registry, model);

    let c1 = registry.add_container("C1", model, None).unwrap();
    let c2 = registry.add_container("C2", model, Some(c1)).unwrap();
    let parent_set = registry
        .add_entity_set(c1, EntitySet::new("Customers", customer).unwrap())
        .unwrap();

    assert_eq!(registry.entity_set_by_name(c2, "Customers"), Some(parent_set));
    assert_eq!(registry.own_entity_set(c2, "Customers"), None);

    let child_set = registry
        .add_entity_set(c2, EntitySet::new("Customers", customer).unwrap())
        .unwrap();
    assert_eq!(registry.entity_set_by_name(c2, "Customers"), Some(child_set));
    assert_eq!(registry.entity_set_by_name(c1, "Customers"), Some(parent_set));
}

#[test]
fn test_nearest_ancestor_wins() {
    let mut registry = Registry::new();
    let model = registry.add_model("Sales").unwrap();
    let customer = customer_type(&mut registry, model);

    let grandparent = registry.add_container("Root", model, None).unwrap();
    let parent = registry.add_container("Middle", model, Some(grandparent)).unwrap();
    let child = registry.add_container("Leaf", model, Some(parent)).unwrap();

    registry
        .add_entity_set(grandparent, EntitySet::new("Customers", customer).unwrap())
        .unwrap();
    let middle_set = registry
        .add_entity_set(parent, EntitySet::new("Customers", customer).unwrap())
        .unwrap();
    let root_only = registry
        .add_entity_set(grandparent, EntitySet::new("Archive", customer).unwrap())
        .unwrap();

    assert_eq!(registry.entity_set_by_name(child, "Customers"), Some(middle_set));
    assert_eq!(registry.entity_set_by_name(child, "Archive"), Some(root_only));
}

#[test]
fn test_unknown_entity_set_is_not_found() {
    let fixture = sales_registry();
    assert_eq!(fixture.registry.parent_container(fixture.main), None);
    assert_eq!(fixture.registry.entity_set_by_name(fixture.main, "Unknown"), None);
}

#[test]
fn test_container_full_name() {
    let mut registry = Registry::new();
    let sales = registry.add_model("Company.Sales").unwrap();
    let bare = registry.add_model("").unwrap();

    let main = registry.add_container("Main", sales, None).unwrap();
    let other = registry.add_container("Main", bare, None).unwrap();

    assert_eq!(registry.container_full_name(main).as_deref(), Some("Company.Sales.Main"));
    assert_eq!(registry.container_full_name(other).as_deref(), Some("Main"));
    assert_eq!(registry.container_by_full_name("Company.Sales.Main"), Some(main));
    assert_eq!(registry.container_by_full_name("Main"), Some(other));
}

#[test]
fn test_duplicate_container_name_in_model() {
    let mut registry = Registry::new();
    let model = registry.add_model("Sales").unwrap();
    registry.add_container("Main", model, None).unwrap();
    assert!(matches!(
        registry.add_container("Main", model, None),
        Err(EdmError::DuplicateContainer { .. })
    ));
}

#[test]
fn test_parent_in_other_model_is_referenced() {
    let mut registry = Registry::new();
    let common = registry.add_model("Common").unwrap();
    let sales = registry.add_model("Sales").unwrap();

    let base = registry.add_container("Base", common, None).unwrap();
    assert!(registry.referenced_models(sales).is_empty());

    registry.add_container("Main", sales, Some(base)).unwrap();
    registry.add_container("Reports", sales, Some(base)).unwrap();
    assert_eq!(registry.referenced_models(sales), vec![common]);

    // A parent in the same model registers nothing.
    registry.add_container("Extra", common, Some(base)).unwrap();
    assert!(registry.referenced_models(common).is_empty());
}

#[test]
fn test_entity_set_requires_entity_type() {
    let SalesFixture {
        mut registry,
        main,
        address,
        ..
    } = sales_registry();

    let err = registry
        .add_entity_set(main, EntitySet::new("Addresses", address).unwrap())
        .unwrap_err();
    assert_eq!(err, EdmError::EntityTypeExpected("Sales.Address".to_string()));
}

#[test]
fn test_etag_is_never_nullable() {
    let field = FieldRef::new("app::Customer", "version");
    let mut etag = ResourcePropertyDescription::etag("Version", field, PrimitiveType::Int64).unwrap();
    assert!(!etag.is_nullable());
    assert!(!etag.is_collection());

    etag.set_nullable(true);
    assert!(!etag.is_nullable());

    let built = PropertyBuilder::etag("Version", PrimitiveType::Int64)
        .nullable(true)
        .build("app::Customer")
        .unwrap();
    assert!(!built.is_nullable());
    assert!(built.is_etag());
}

#[test]
fn test_set_nullable_through_registry() {
    let SalesFixture {
        mut registry,
        customer,
        ..
    } = sales_registry();

    let id = registry.property_by_name(customer, "Address").unwrap();
    assert!(registry.property(id).unwrap().is_nullable());
    registry.set_nullable(id, false).unwrap();
    assert!(!registry.property(id).unwrap().is_nullable());

    let etag = registry.etag_property(customer).unwrap();
    registry.set_nullable(etag, true).unwrap();
    assert!(!registry.property(etag).unwrap().is_nullable());
}

#[test]
fn test_structured_type_is_set_once() {
    let SalesFixture {
        mut registry,
        customer,
        order,
        ..
    } = sales_registry();

    let field = FieldRef::new("app::Customer", "email");
    let description =
        ResourcePropertyDescription::primitive("Email", field, PrimitiveType::String, false, true).unwrap();
    let property = registry.add_property(description);
    assert_eq!(registry.property_owner(property), None);

    registry.set_structured_type(property, customer).unwrap();
    assert_eq!(registry.property_owner(property), Some(customer));

    let err = registry.set_structured_type(property, order).unwrap_err();
    assert_eq!(
        err,
        EdmError::OwnerAlreadySet {
            property: "Email".to_string(),
            owner: "Sales.Customer".to_string(),
        }
    );
}

#[test]
fn test_inherited_properties_base_first() {
    let fixture = sales_registry();
    let registry = &fixture.registry;

    let names: Vec<&str> = registry
        .all_properties(fixture.vip_customer)
        .into_iter()
        .map(|id| registry.property(id).unwrap().name())
        .collect();
    assert_eq!(names, vec!["Id", "Version", "Address", "Discount"]);

    assert_eq!(registry.properties(fixture.vip_customer).len(), 1);
    assert_eq!(registry.base_type(fixture.vip_customer), Some(fixture.customer));
    assert_eq!(registry.derived_types(fixture.customer), vec![fixture.vip_customer]);

    let inherited = registry.property_by_name(fixture.vip_customer, "Id").unwrap();
    assert_eq!(registry.property_owner(inherited), Some(fixture.customer));
    assert_eq!(
        registry.etag_property(fixture.vip_customer),
        registry.etag_property(fixture.customer)
    );
}

#[test]
fn test_duplicate_inherited_property_leaves_registry_unchanged() {
    let SalesFixture {
        mut registry,
        model,
        customer,
        ..
    } = sales_registry();
    let nodes = registry.node_count();
    let edges = registry.edge_count();

    let err = StructuredTypeBuilder::entity("Partner", "app::Partner")
        .base(customer)
        .property(PropertyBuilder::primitive("Rating", PrimitiveType::Byte))
        .property(PropertyBuilder::primitive("Id", PrimitiveType::Guid))
        .build(&mut registry, model)
        .unwrap_err();

    assert_eq!(
        err,
        EdmError::DuplicateProperty {
            property: "Id".to_string(),
            type_name: "Sales.Partner".to_string(),
        }
    );
    assert_eq!(registry.node_count(), nodes);
    assert_eq!(registry.edge_count(), edges);
    assert_eq!(registry.type_by_full_name("Sales.Partner"), None);
}

#[test]
fn test_property_added_to_base_conflicts_with_derived() {
    let SalesFixture {
        mut registry,
        customer,
        ..
    } = sales_registry();

    let field = FieldRef::new("app::Customer", "discount");
    let description =
        ResourcePropertyDescription::primitive("Discount", field, PrimitiveType::Decimal, false, true).unwrap();
    assert!(matches!(
        registry.attach_property(customer, description),
        Err(EdmError::DuplicateProperty { .. })
    ));
}

#[test]
fn test_etag_rules() {
    let SalesFixture {
        mut registry,
        model,
        customer,
        ..
    } = sales_registry();

    let err = StructuredTypeBuilder::entity("Partner", "app::Partner")
        .base(customer)
        .property(PropertyBuilder::etag("Stamp", PrimitiveType::Binary))
        .build(&mut registry, model)
        .unwrap_err();
    assert_eq!(err, EdmError::MultipleETags("Sales.Partner".to_string()));

    let err = StructuredTypeBuilder::entity("Invoice", "app::Invoice")
        .property(PropertyBuilder::etag("A", PrimitiveType::Int64))
        .property(PropertyBuilder::etag("B", PrimitiveType::Int64))
        .build(&mut registry, model)
        .unwrap_err();
    assert_eq!(err, EdmError::MultipleETags("Sales.Invoice".to_string()));

    let err = StructuredTypeBuilder::complex("Money", "app::Money")
        .property(PropertyBuilder::etag("Stamp", PrimitiveType::Int64))
        .build(&mut registry, model)
        .unwrap_err();
    assert_eq!(err, EdmError::ETagOnComplexType("Sales.Money".to_string()));
}

#[test]
fn test_value_type_kinds_are_checked() {
    let SalesFixture {
        mut registry,
        model,
        address,
        customer,
        ..
    } = sales_registry();

    let err = StructuredTypeBuilder::entity("Shipment", "app::Shipment")
        .property(PropertyBuilder::complex("Recipient", customer))
        .build(&mut registry, model)
        .unwrap_err();
    assert_eq!(err, EdmError::ComplexTypeExpected("Sales.Customer".to_string()));

    let err = StructuredTypeBuilder::entity("Shipment", "app::Shipment")
        .property(PropertyBuilder::navigation("Destination", address))
        .build(&mut registry, model)
        .unwrap_err();
    assert_eq!(err, EdmError::EntityTypeExpected("Sales.Address".to_string()));

    let err = StructuredTypeBuilder::complex("GeoAddress", "app::GeoAddress")
        .base(customer)
        .build(&mut registry, model)
        .unwrap_err();
    assert!(matches!(err, EdmError::BaseTypeKindMismatch { .. }));
}

#[test]
fn test_navigation_flags() {
    let SalesFixture {
        mut registry,
        customer,
        order,
        ..
    } = sales_registry();

    let orders = PropertyBuilder::navigation("Orders", order)
        .collection()
        .entity_reference(false)
        .entity_set_reference(true)
        .build("app::Customer")
        .unwrap();
    let id = registry.attach_property(customer, orders).unwrap();

    let property = registry.property(id).unwrap();
    let navigation = property.navigation_info().unwrap();
    assert_eq!(navigation.target, order);
    assert!(navigation.is_bag);
    assert!(navigation.is_entity_set_reference);
    assert!(!navigation.is_entity_reference);
    assert!(property.is_collection());
    assert_eq!(property.value_type(), ResourceType::Structured(order));
}

#[test]
fn test_navigation_flags_follow_collection() {
    let SalesFixture {
        mut registry,
        customer,
        order,
        ..
    } = sales_registry();

    let orders = PropertyBuilder::navigation("Orders", order)
        .collection()
        .build("app::Customer")
        .unwrap();
    let id = registry.attach_property(customer, orders).unwrap();
    let navigation = *registry.property(id).unwrap().navigation_info().unwrap();
    assert!(navigation.is_bag);
    assert!(navigation.is_entity_set_reference);
    assert!(!navigation.is_entity_reference);

    let back = registry.property_by_name(order, "Customer").unwrap();
    let navigation = *registry.property(back).unwrap().navigation_info().unwrap();
    assert!(!navigation.is_bag);
    assert!(navigation.is_entity_reference);
    assert!(!navigation.is_entity_set_reference);
}

#[test]
fn test_default_model_cache_does_not_collide() {
    let root = std::path::Path::new("project");
    assert_ne!(model_cache_path(root, ""), model_cache_path(root, "_default"));
    assert!(validate_namespace(DEFAULT_MODEL_CACHE).is_err());

    let mut registry = Registry::new();
    let unnamed = registry.add_model("").unwrap();
    let named = registry.add_model("_default").unwrap();
    for model in [unnamed, named] {
        StructuredTypeBuilder::entity("Item", "app::Item")
            .property(PropertyBuilder::primitive("Id", PrimitiveType::Int32))
            .build(&mut registry, model)
            .unwrap();
    }

    let dir = tempfile::TempDir::new().unwrap();
    let first = save_model_cache(&registry, unnamed, dir.path()).unwrap();
    let second = save_model_cache(&registry, named, dir.path()).unwrap();
    assert_ne!(first, second);
    assert_eq!(load_model_cache(dir.path(), "").unwrap().unwrap().namespace, "");
    assert_eq!(
        load_model_cache(dir.path(), "_default").unwrap().unwrap().namespace,
        "_default"
    );
}

#[test]
fn test_primitive_type_names() {
    assert_eq!(PrimitiveType::from_name("Guid"), Some(PrimitiveType::Guid));
    assert_eq!(PrimitiveType::from_name("Edm.DateTimeOffset"), Some(PrimitiveType::DateTimeOffset));
    assert_eq!(PrimitiveType::from_name("Edm."), None);
    assert_eq!(PrimitiveType::from_name("Sales.Guid"), None);
    assert_eq!(PrimitiveType::DateTime.full_name(), "Edm.DateTime");
    assert_eq!(PrimitiveType::Guid.namespace(), "Edm");
    assert_eq!(PrimitiveType::Guid.to_string(), "Edm.Guid");
}

#[test]
fn test_type_lookup_and_names() {
    let fixture = sales_registry();
    let registry = &fixture.registry;

    assert_eq!(registry.type_by_full_name("Sales.Order"), Some(fixture.order));
    assert_eq!(registry.type_namespace(fixture.order), Some("Sales"));
    assert_eq!(
        registry.resource_type_full_name(ResourceType::Structured(fixture.address)).as_deref(),
        Some("Sales.Address")
    );
    assert_eq!(
        registry.resource_type_full_name(PrimitiveType::Int32.into()).as_deref(),
        Some("Edm.Int32")
    );
    assert_eq!(registry.structured_types(fixture.model).len(), 4);

    let address = ResourceType::Structured(fixture.address);
    assert_eq!(registry.resource_type_name(address), Some("Address"));
    assert_eq!(registry.resource_type_namespace(address), Some("Sales"));
    assert_eq!(registry.resource_type_namespace(PrimitiveType::Guid.into()), Some("Edm"));
}

#[test]
fn test_error_categories() {
    assert!(EdmError::DuplicateType("Sales.Order".to_string()).is_invalid_argument());
    assert!(EdmError::NotBoolean { field: "nullable".to_string() }.is_invalid_argument());
    assert!(
        !EdmError::MalformedCacheRecord { field: "kind".to_string() }.is_invalid_argument()
    );
}

#[test]
fn test_cache_record_round_trip_binds_field() {
    let fixture = sales_registry();
    let registry = &fixture.registry;

    let mut catalog = ClassCatalog::new();
    catalog.declare("app::Customer", ["Id", "Version", "address"]);

    let id = registry.property_by_name(fixture.customer, "Address").unwrap();
    let record = PropertyCacheRecord::from_description(registry, id).unwrap();
    assert_eq!(record.owner, "Sales.Customer");
    assert_eq!(record.value_type, "Sales.Address");
    assert_eq!(record.kind, PropertyKindTag::Complex);

    let decoded = PropertyCacheRecord::from_json(&record.to_json().unwrap()).unwrap();
    assert_eq!(decoded, record);

    let field = decoded.bind(&catalog).unwrap();
    assert_eq!(&field, registry.property(id).unwrap().field());
    assert_eq!(field, FieldRef::new("app::Customer", "address"));
}

#[test]
fn test_cache_record_rejects_non_boolean_flag() {
    let fixture = sales_registry();
    let id = fixture.registry.property_by_name(fixture.customer, "Id").unwrap();
    let mut json = PropertyCacheRecord::from_description(&fixture.registry, id)
        .unwrap()
        .to_json()
        .unwrap();
    json["nullable"] = serde_json::json!("yes");

    assert_eq!(
        PropertyCacheRecord::from_json(&json).unwrap_err(),
        EdmError::NotBoolean {
            field: "nullable".to_string()
        }
    );

    json.as_object_mut().unwrap().remove("nullable");
    assert!(matches!(
        PropertyCacheRecord::from_json(&json),
        Err(EdmError::MalformedCacheRecord { .. })
    ));
}

#[test]
fn test_bind_unknown_field() {
    let catalog = ClassCatalog::new();
    assert_eq!(
        bind_field(&catalog, "app::Customer", "missing").unwrap_err(),
        EdmError::UnknownField {
            class: "app::Customer".to_string(),
            field: "missing".to_string(),
        }
    );
}

#[test]
fn test_save_and_load_model_cache() {
    let fixture = sales_registry();
    let dir = tempfile::TempDir::new().unwrap();

    let path = save_model_cache(&fixture.registry, fixture.model, dir.path()).unwrap();
    assert_eq!(path, model_cache_path(dir.path(), "Sales"));

    let loaded = load_model_cache(dir.path(), "Sales").unwrap().unwrap();
    assert_eq!(loaded.namespace, "Sales");
    assert_eq!(loaded.properties.len(), 9);
    assert_eq!(
        loaded.properties,
        ModelCache::collect(&fixture.registry, fixture.model).unwrap().properties
    );

    assert!(load_model_cache(dir.path(), "Other").unwrap().is_none());
    clear_cache(dir.path()).unwrap();
    assert!(!cache_dir(dir.path()).exists());
}

#[test]
fn test_registry_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Registry>();
}

#[test]
fn test_outline() {
    let fixture = sales_registry();
    insta::assert_snapshot!(outline(&fixture.registry), @r"
    model Sales
      complex type Sales.Address
        Street: Edm.String
        City: Edm.String
      entity type Sales.Customer
        Id: Edm.Guid not null
        Version: Edm.Int64 etag not null
        Address: Sales.Address
      entity type Sales.VipCustomer : Sales.Customer
        Discount: Edm.Decimal
      entity type Sales.Order
        Id: Edm.Int32 not null
        PlacedAt: Edm.DateTimeOffset
        Customer: Sales.Customer navigation
      container Sales.Main
        Customers: Sales.Customer
        Orders: Sales.Order
    ");
}
