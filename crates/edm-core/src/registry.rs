//! The description graph: models, containers, sets, types and properties
//! stored in a petgraph::StableDiGraph and addressed through typed ids

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::error::{EdmError, NamedConstruct, Result};
use crate::model::*;
use crate::naming::{qualify, split_qualified, validate_name, validate_namespace};

/// Node payloads.
#[derive(Debug, Clone)]
enum Node {
    Model(EntityDataModel),
    Container(EntityContainer),
    EntitySet(EntitySet),
    Type(StructuredType),
    Property(ResourcePropertyDescription),
}

/// Edge kinds. Edges point from the dependent node to the node it refers to,
/// except `Contains` and `Owns` which point from owner to owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// container/type → model
    DefinedIn,
    /// container → parent container
    Parent,
    /// container → entity set
    Contains,
    /// structured type → property description
    Owns,
    /// derived type → base type
    Inherits,
    /// model → referenced model
    References,
}

/// Owns every node of one or more entity data models.
///
/// Assembly goes through `&mut Registry`; once assembled the registry is
/// read-only and can be shared between threads.
pub struct Registry {
    inner: StableDiGraph<Node, Relation>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: StableDiGraph::new(),
        }
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    // ── Graph helpers ───────────────────────────────────────

    fn targets(&self, idx: NodeIndex, relation: Relation) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner
            .edges_directed(idx, Direction::Outgoing)
            .filter(move |edge| *edge.weight() == relation)
            .map(|edge| edge.target())
    }

    fn sources(&self, idx: NodeIndex, relation: Relation) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .filter(move |edge| *edge.weight() == relation)
            .map(|edge| edge.source())
    }

    /// Sources of `relation` edges into `idx`, by node index. Nodes are never
    /// removed, so this is also insertion order.
    fn sorted_sources(&self, idx: NodeIndex, relation: Relation) -> Vec<NodeIndex> {
        let mut sources: Vec<NodeIndex> = self.sources(idx, relation).collect();
        sources.sort();
        sources
    }

    fn sorted_targets(&self, idx: NodeIndex, relation: Relation) -> Vec<NodeIndex> {
        let mut targets: Vec<NodeIndex> = self.targets(idx, relation).collect();
        targets.sort();
        targets
    }

    // ── Models ──────────────────────────────────────────────

    /// Register a model. Namespaces are unique within the registry.
    pub fn add_model(&mut self, namespace: impl Into<String>) -> Result<ModelId> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        if self.model_by_namespace(&namespace).is_some() {
            return Err(EdmError::DuplicateNamespace(namespace));
        }

        tracing::debug!("Adding model '{}'", namespace);
        let idx = self.inner.add_node(Node::Model(EntityDataModel { namespace }));
        Ok(ModelId(idx))
    }

    pub fn model(&self, id: ModelId) -> Option<&EntityDataModel> {
        match self.inner.node_weight(id.0)? {
            Node::Model(model) => Some(model),
            _ => None,
        }
    }

    fn require_model(&self, id: ModelId) -> Result<&EntityDataModel> {
        self.model(id).ok_or(EdmError::UnknownNode("model"))
    }

    /// All models, in registration order.
    pub fn models(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.inner
            .node_indices()
            .filter(move |&idx| matches!(self.inner.node_weight(idx), Some(Node::Model(_))))
            .map(ModelId)
    }

    pub fn model_by_namespace(&self, namespace: &str) -> Option<ModelId> {
        self.models()
            .find(|&id| self.model(id).is_some_and(|m| m.namespace == namespace))
    }

    /// Record that `model` references `referenced`. Returns false when the
    /// reference already existed or both ids name the same model.
    pub fn add_referenced_model(&mut self, model: ModelId, referenced: ModelId) -> Result<bool> {
        self.require_model(model)?;
        self.require_model(referenced)?;
        if model == referenced || self.references_model(model, referenced) {
            return Ok(false);
        }
        self.inner.add_edge(model.0, referenced.0, Relation::References);
        Ok(true)
    }

    pub fn references_model(&self, model: ModelId, other: ModelId) -> bool {
        self.targets(model.0, Relation::References)
            .any(|idx| idx == other.0)
    }

    pub fn referenced_models(&self, model: ModelId) -> Vec<ModelId> {
        self.sorted_targets(model.0, Relation::References)
            .into_iter()
            .map(ModelId)
            .collect()
    }

    // ── Containers ──────────────────────────────────────────

    /// Add an entity container to `model`, optionally chained to a parent
    /// container. When the parent lives in another model, that model is
    /// registered as a referenced model of `model`.
    pub fn add_container(
        &mut self,
        name: impl Into<String>,
        model: ModelId,
        parent: Option<ContainerId>,
    ) -> Result<ContainerId> {
        let name = name.into();
        validate_name(NamedConstruct::EntityContainer, &name)?;
        let namespace = self.require_model(model)?.namespace.clone();

        let parent_model = match parent {
            Some(parent) => {
                self.container(parent)
                    .ok_or(EdmError::UnknownNode("entity container"))?;
                self.container_model(parent)
            }
            None => None,
        };

        if self.container_by_name(model, &name).is_some() {
            return Err(EdmError::DuplicateContainer { name, namespace });
        }

        tracing::debug!("Adding entity container '{}'", qualify(&namespace, &name));
        let idx = self.inner.add_node(Node::Container(EntityContainer { name }));
        self.inner.add_edge(idx, model.0, Relation::DefinedIn);
        if let Some(parent) = parent {
            self.inner.add_edge(idx, parent.0, Relation::Parent);
        }

        if let Some(parent_model) = parent_model {
            if self.add_referenced_model(model, parent_model)? {
                tracing::debug!(
                    "Registered '{}' as referenced model of '{}'",
                    self.model(parent_model).map_or("", |m| m.namespace()),
                    namespace
                );
            }
        }

        Ok(ContainerId(idx))
    }

    pub fn container(&self, id: ContainerId) -> Option<&EntityContainer> {
        match self.inner.node_weight(id.0)? {
            Node::Container(container) => Some(container),
            _ => None,
        }
    }

    fn require_container(&self, id: ContainerId) -> Result<&EntityContainer> {
        self.container(id)
            .ok_or(EdmError::UnknownNode("entity container"))
    }

    /// The model the container is defined on.
    pub fn container_model(&self, id: ContainerId) -> Option<ModelId> {
        self.container(id)?;
        self.targets(id.0, Relation::DefinedIn).next().map(ModelId)
    }

    pub fn container_namespace(&self, id: ContainerId) -> Option<&str> {
        let model = self.container_model(id)?;
        self.model(model).map(EntityDataModel::namespace)
    }

    /// `Namespace.Name`, or the bare name when the model has no namespace.
    pub fn container_full_name(&self, id: ContainerId) -> Option<String> {
        let container = self.container(id)?;
        let namespace = self.container_namespace(id)?;
        Some(qualify(namespace, &container.name))
    }

    pub fn parent_container(&self, id: ContainerId) -> Option<ContainerId> {
        self.container(id)?;
        self.targets(id.0, Relation::Parent).next().map(ContainerId)
    }

    /// Containers defined on `model`, in insertion order.
    pub fn containers(&self, model: ModelId) -> Vec<ContainerId> {
        self.sorted_sources(model.0, Relation::DefinedIn)
            .into_iter()
            .map(ContainerId)
            .filter(|&id| self.container(id).is_some())
            .collect()
    }

    pub fn container_by_name(&self, model: ModelId, name: &str) -> Option<ContainerId> {
        self.containers(model)
            .into_iter()
            .find(|&id| self.container(id).is_some_and(|c| c.name == name))
    }

    pub fn container_by_full_name(&self, full_name: &str) -> Option<ContainerId> {
        let (namespace, name) = split_qualified(full_name);
        let model = self.model_by_namespace(namespace)?;
        self.container_by_name(model, name)
    }

    // ── Entity sets ─────────────────────────────────────────

    /// Add an entity set to a container and make the container its owner.
    ///
    /// Names must be unique within the container itself; a set may shadow a
    /// set of the same name in a parent container.
    pub fn add_entity_set(&mut self, container: ContainerId, set: EntitySet) -> Result<EntitySetId> {
        self.require_container(container)?;
        let entity_type = self.require_type(set.entity_type())?;
        if !entity_type.is_entity_type() {
            return Err(EdmError::EntityTypeExpected(
                self.type_full_name(set.entity_type()).unwrap_or_default(),
            ));
        }

        let container_name = self.container_full_name(container).unwrap_or_default();
        if self.own_entity_set(container, set.name()).is_some() {
            return Err(EdmError::DuplicateEntitySet {
                set: set.name().to_string(),
                container: container_name,
            });
        }

        tracing::debug!("Adding entity set '{}' to '{}'", set.name(), container_name);
        let idx = self.inner.add_node(Node::EntitySet(set));
        self.inner.add_edge(container.0, idx, Relation::Contains);
        Ok(EntitySetId(idx))
    }

    pub fn entity_set(&self, id: EntitySetId) -> Option<&EntitySet> {
        match self.inner.node_weight(id.0)? {
            Node::EntitySet(set) => Some(set),
            _ => None,
        }
    }

    /// The container the set was added to.
    pub fn container_of(&self, id: EntitySetId) -> Option<ContainerId> {
        self.entity_set(id)?;
        self.sources(id.0, Relation::Contains).next().map(ContainerId)
    }

    /// Sets declared by the container itself, sorted by name.
    pub fn entity_sets(&self, container: ContainerId) -> Vec<EntitySetId> {
        let mut sets: Vec<EntitySetId> = self
            .targets(container.0, Relation::Contains)
            .map(EntitySetId)
            .collect();
        sets.sort_by(|a, b| {
            let a = self.entity_set(*a).map(EntitySet::name);
            let b = self.entity_set(*b).map(EntitySet::name);
            a.cmp(&b)
        });
        sets
    }

    /// Look only at the container's own sets.
    pub fn own_entity_set(&self, container: ContainerId, name: &str) -> Option<EntitySetId> {
        self.targets(container.0, Relation::Contains)
            .map(EntitySetId)
            .find(|&id| self.entity_set(id).is_some_and(|s| s.name() == name))
    }

    /// Resolve an entity set by name: the container's own sets first, then
    /// each ancestor's own sets from the nearest parent upward.
    pub fn entity_set_by_name(&self, container: ContainerId, name: &str) -> Option<EntitySetId> {
        if let Some(set) = self.own_entity_set(container, name) {
            return Some(set);
        }

        let mut current = container;
        while let Some(parent) = self.parent_container(current) {
            if let Some(set) = self.own_entity_set(parent, name) {
                tracing::debug!(
                    "Resolved entity set '{}' through parent container '{}'",
                    name,
                    self.container_full_name(parent).unwrap_or_default()
                );
                return Some(set);
            }
            current = parent;
        }

        None
    }

    // ── Structured types ────────────────────────────────────

    /// Add a structured type to `model`, optionally deriving from `base`.
    pub fn add_structured_type(
        &mut self,
        model: ModelId,
        ty: StructuredType,
        base: Option<TypeId>,
    ) -> Result<TypeId> {
        self.check_structured_type(model, &ty, base)?;

        tracing::debug!("Adding {} '{}'", ty.kind(), ty.name());
        let idx = self.inner.add_node(Node::Type(ty));
        self.inner.add_edge(idx, model.0, Relation::DefinedIn);
        if let Some(base) = base {
            self.inner.add_edge(idx, base.0, Relation::Inherits);
        }
        Ok(TypeId(idx))
    }

    pub(crate) fn check_structured_type(
        &self,
        model: ModelId,
        ty: &StructuredType,
        base: Option<TypeId>,
    ) -> Result<()> {
        let namespace = self.require_model(model)?.namespace();
        let full_name = qualify(namespace, ty.name());
        if self.type_by_full_name(&full_name).is_some() {
            return Err(EdmError::DuplicateType(full_name));
        }

        if let Some(base) = base {
            let base_type = self.require_type(base)?;
            if base_type.kind() != ty.kind() {
                return Err(EdmError::BaseTypeKindMismatch {
                    name: full_name,
                    base: self.type_full_name(base).unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    pub fn structured_type(&self, id: TypeId) -> Option<&StructuredType> {
        match self.inner.node_weight(id.0)? {
            Node::Type(ty) => Some(ty),
            _ => None,
        }
    }

    fn require_type(&self, id: TypeId) -> Result<&StructuredType> {
        self.structured_type(id)
            .ok_or(EdmError::UnknownNode("structured type"))
    }

    pub fn type_model(&self, id: TypeId) -> Option<ModelId> {
        self.structured_type(id)?;
        self.targets(id.0, Relation::DefinedIn).next().map(ModelId)
    }

    pub fn type_namespace(&self, id: TypeId) -> Option<&str> {
        let model = self.type_model(id)?;
        self.model(model).map(EntityDataModel::namespace)
    }

    pub fn type_full_name(&self, id: TypeId) -> Option<String> {
        let ty = self.structured_type(id)?;
        Some(qualify(self.type_namespace(id)?, ty.name()))
    }

    pub fn type_by_full_name(&self, full_name: &str) -> Option<TypeId> {
        let (namespace, name) = split_qualified(full_name);
        let model = self.model_by_namespace(namespace)?;
        self.structured_types(model)
            .into_iter()
            .find(|&id| self.structured_type(id).is_some_and(|t| t.name() == name))
    }

    /// Types defined on `model`, in insertion order.
    pub fn structured_types(&self, model: ModelId) -> Vec<TypeId> {
        self.sorted_sources(model.0, Relation::DefinedIn)
            .into_iter()
            .map(TypeId)
            .filter(|&id| self.structured_type(id).is_some())
            .collect()
    }

    pub fn is_entity_type(&self, id: TypeId) -> bool {
        self.structured_type(id)
            .is_some_and(StructuredType::is_entity_type)
    }

    pub fn base_type(&self, id: TypeId) -> Option<TypeId> {
        self.structured_type(id)?;
        self.targets(id.0, Relation::Inherits).next().map(TypeId)
    }

    /// The type itself followed by its bases, nearest first.
    pub fn base_chain(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = self.structured_type(id).map(|_| id);
        while let Some(ty) = current {
            chain.push(ty);
            current = self.base_type(ty);
        }
        chain
    }

    /// Types deriving directly from `id`.
    pub fn derived_types(&self, id: TypeId) -> Vec<TypeId> {
        self.sorted_sources(id.0, Relation::Inherits)
            .into_iter()
            .map(TypeId)
            .collect()
    }

    /// All types deriving from `id`, directly or transitively.
    pub fn descendants(&self, id: TypeId) -> Vec<TypeId> {
        let mut descendants = Vec::new();
        let mut to_visit = self.derived_types(id);

        while let Some(current) = to_visit.pop() {
            descendants.push(current);
            to_visit.extend(self.derived_types(current));
        }

        descendants.sort();
        descendants
    }

    /// Bare name of a property value type.
    pub fn resource_type_name(&self, ty: ResourceType) -> Option<&str> {
        match ty {
            ResourceType::Primitive(primitive) => Some(primitive.name()),
            ResourceType::Structured(id) => self.structured_type(id).map(StructuredType::name),
        }
    }

    pub fn resource_type_namespace(&self, ty: ResourceType) -> Option<&str> {
        match ty {
            ResourceType::Primitive(primitive) => Some(primitive.namespace()),
            ResourceType::Structured(id) => self.type_namespace(id),
        }
    }

    /// Full name of a property value type.
    pub fn resource_type_full_name(&self, ty: ResourceType) -> Option<String> {
        match ty {
            ResourceType::Primitive(primitive) => Some(primitive.full_name()),
            ResourceType::Structured(id) => self.type_full_name(id),
        }
    }

    // ── Property descriptions ───────────────────────────────

    /// Insert a property description with no owner yet.
    pub fn add_property(&mut self, property: ResourcePropertyDescription) -> PropertyId {
        PropertyId(self.inner.add_node(Node::Property(property)))
    }

    /// Attach the structured type a property belongs to. A property can only
    /// be attached once.
    pub fn set_structured_type(&mut self, property: PropertyId, ty: TypeId) -> Result<()> {
        let description = self.require_property(property)?;
        if let Some(owner) = self.property_owner(property) {
            return Err(EdmError::OwnerAlreadySet {
                property: description.name().to_string(),
                owner: self.type_full_name(owner).unwrap_or_default(),
            });
        }
        self.check_property(ty, description)?;

        tracing::debug!(
            "Attaching property '{}' to '{}'",
            description.name(),
            self.type_full_name(ty).unwrap_or_default()
        );
        self.inner.add_edge(ty.0, property.0, Relation::Owns);
        Ok(())
    }

    /// Validate, insert and attach a property in one step. Nothing is
    /// inserted when validation fails.
    pub fn attach_property(
        &mut self,
        ty: TypeId,
        property: ResourcePropertyDescription,
    ) -> Result<PropertyId> {
        self.check_property(ty, &property)?;
        let id = self.add_property(property);
        self.set_structured_type(id, ty)?;
        Ok(id)
    }

    fn check_property(&self, ty: TypeId, property: &ResourcePropertyDescription) -> Result<()> {
        let owner = self.require_type(ty)?;
        let owner_name = self.type_full_name(ty).unwrap_or_default();
        let mut scope = self.base_chain(ty);
        scope.extend(self.descendants(ty));
        self.check_property_in_scope(owner.kind(), &owner_name, &scope, property)
    }

    /// Check a property against the types it would share a namespace of
    /// property names with.
    pub(crate) fn check_property_in_scope(
        &self,
        owner_kind: StructuredKind,
        owner_name: &str,
        scope: &[TypeId],
        property: &ResourcePropertyDescription,
    ) -> Result<()> {
        let declared = || {
            scope
                .iter()
                .flat_map(|&ty| self.properties(ty))
                .filter_map(|id| self.property(id))
        };

        if declared().any(|p| p.name() == property.name()) {
            return Err(EdmError::DuplicateProperty {
                property: property.name().to_string(),
                type_name: owner_name.to_string(),
            });
        }

        match property.kind() {
            PropertyKind::Primitive => {}
            PropertyKind::ETag => {
                if owner_kind == StructuredKind::Complex {
                    return Err(EdmError::ETagOnComplexType(owner_name.to_string()));
                }
                if declared().any(ResourcePropertyDescription::is_etag) {
                    return Err(EdmError::MultipleETags(owner_name.to_string()));
                }
            }
            PropertyKind::Complex => {
                let value_type = property
                    .value_type()
                    .as_structured()
                    .ok_or_else(|| EdmError::ComplexTypeExpected(property.name().to_string()))?;
                if !self.require_type(value_type)?.is_complex_type() {
                    return Err(EdmError::ComplexTypeExpected(
                        self.type_full_name(value_type).unwrap_or_default(),
                    ));
                }
            }
            PropertyKind::Navigation(navigation) => {
                if !self.require_type(navigation.target)?.is_entity_type() {
                    return Err(EdmError::EntityTypeExpected(
                        self.type_full_name(navigation.target).unwrap_or_default(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn property(&self, id: PropertyId) -> Option<&ResourcePropertyDescription> {
        match self.inner.node_weight(id.0)? {
            Node::Property(property) => Some(property),
            _ => None,
        }
    }

    fn require_property(&self, id: PropertyId) -> Result<&ResourcePropertyDescription> {
        self.property(id)
            .ok_or(EdmError::UnknownNode("property description"))
    }

    pub fn set_nullable(&mut self, id: PropertyId, nullable: bool) -> Result<()> {
        match self.inner.node_weight_mut(id.0) {
            Some(Node::Property(property)) => {
                property.set_nullable(nullable);
                Ok(())
            }
            _ => Err(EdmError::UnknownNode("property description")),
        }
    }

    /// The structured type the property was attached to.
    pub fn property_owner(&self, id: PropertyId) -> Option<TypeId> {
        self.property(id)?;
        self.sources(id.0, Relation::Owns).next().map(TypeId)
    }

    /// Properties declared on the type itself, in declaration order.
    pub fn properties(&self, ty: TypeId) -> Vec<PropertyId> {
        self.sorted_targets(ty.0, Relation::Owns)
            .into_iter()
            .map(PropertyId)
            .collect()
    }

    /// Inherited properties first (root base type first), then own ones.
    pub fn all_properties(&self, ty: TypeId) -> Vec<PropertyId> {
        self.base_chain(ty)
            .into_iter()
            .rev()
            .flat_map(|t| self.properties(t))
            .collect()
    }

    /// Find a property on the type or any of its bases.
    pub fn property_by_name(&self, ty: TypeId, name: &str) -> Option<PropertyId> {
        self.base_chain(ty)
            .into_iter()
            .flat_map(|t| self.properties(t))
            .find(|&id| self.property(id).is_some_and(|p| p.name() == name))
    }

    /// The e-tag property of the type, declared on it or inherited.
    pub fn etag_property(&self, ty: TypeId) -> Option<PropertyId> {
        self.base_chain(ty)
            .into_iter()
            .flat_map(|t| self.properties(t))
            .find(|&id| self.property(id).is_some_and(ResourcePropertyDescription::is_etag))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
