//! Test fixtures for EDM Core

use crate::builder::{PropertyBuilder, StructuredTypeBuilder};
use crate::model::{ContainerId, EntitySet, ModelId, PrimitiveType, TypeId};
use crate::registry::Registry;

/// Handles into the registry built by [`sales_registry`].
pub struct SalesFixture {
    pub registry: Registry,
    pub model: ModelId,
    pub address: TypeId,
    pub customer: TypeId,
    pub vip_customer: TypeId,
    pub order: TypeId,
    pub main: ContainerId,
}

/// A `Sales` model: an `Address` complex type, `Customer` / `VipCustomer` /
/// `Order` entity types and a `Main` container with `Customers` and `Orders`.
pub fn sales_registry() -> SalesFixture {
    let mut registry = Registry::new();
    let model = registry.add_model("Sales").unwrap();

    let address = StructuredTypeBuilder::complex("Address", "app::Address")
        .property(PropertyBuilder::primitive("Street", PrimitiveType::String))
        .property(PropertyBuilder::primitive("City", PrimitiveType::String))
        .build(&mut registry, model)
        .unwrap();

    let customer = StructuredTypeBuilder::entity("Customer", "app::Customer")
        .property(PropertyBuilder::primitive("Id", PrimitiveType::Guid).nullable(false))
        .property(PropertyBuilder::etag("Version", PrimitiveType::Int64))
        .property(PropertyBuilder::complex("Address", address).field("address"))
        .build(&mut registry, model)
        .unwrap();

    let vip_customer = StructuredTypeBuilder::entity("VipCustomer", "app::VipCustomer")
        .base(customer)
        .property(PropertyBuilder::primitive("Discount", PrimitiveType::Decimal))
        .build(&mut registry, model)
        .unwrap();

    let order = StructuredTypeBuilder::entity("Order", "app::Order")
        .property(PropertyBuilder::primitive("Id", PrimitiveType::Int32).nullable(false))
        .property(PropertyBuilder::primitive("PlacedAt", PrimitiveType::DateTimeOffset))
        .property(PropertyBuilder::navigation("Customer", customer))
        .build(&mut registry, model)
        .unwrap();

    let main = registry.add_container("Main", model, None).unwrap();
    registry
        .add_entity_set(main, EntitySet::new("Customers", customer).unwrap())
        .unwrap();
    registry
        .add_entity_set(main, EntitySet::new("Orders", order).unwrap())
        .unwrap();

    SalesFixture {
        registry,
        model,
        address,
        customer,
        vip_customer,
        order,
        main,
    }
}
