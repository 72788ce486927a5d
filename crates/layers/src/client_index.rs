use std::collections::{BTreeMap, HashMap};

use scene::{Attributes, FeatureId, FeatureStore, GeometryKind};
use serde::Serialize;

use crate::buildings::BuildingIndex;

/// Attribute keys checked for the owning client, in priority order.
pub const CLIENT_ATTRIBUTE_KEYS: &[&str] = &[
    "Client Name",
    "client_name",
    "CLIENT_NAME",
    "Client_Name",
    "client",
    "Client",
    "CLIENT",
    "organisation",
    "Organisation",
    "ORGANISATION",
    "organisation_name",
    "ORGANISATION_NAME",
    "Organisation_Name",
    "client_organisation",
    "CLIENT_ORGANISATION",
    "Client_Organisation",
    "property_owner",
    "PROPERTY_OWNER",
    "Property_Owner",
    "owner",
    "Owner",
    "OWNER",
    "landlord",
    "Landlord",
    "LANDLORD",
    "tenant",
    "Tenant",
    "TENANT",
    "name",
    "Name",
    "NAME",
];

/// Label of the client owning a feature. Opaque; not unique across sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_plausible_client(value: &str) -> bool {
    value.chars().count() > 2 && !value.chars().all(|c| c.is_ascii_digit())
}

/// First attribute in [`CLIENT_ATTRIBUTE_KEYS`] holding a plausible client name.
///
/// A value qualifies when it is text, longer than two characters and not
/// purely digits. Later keys are not evaluated once one qualifies.
pub fn extract_client_identity(attributes: &Attributes) -> Option<ClientIdentity> {
    CLIENT_ATTRIBUTE_KEYS
        .iter()
        .filter_map(|key| attributes.text(key))
        .find(|value| is_plausible_client(value))
        .map(ClientIdentity::new)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client: ClientIdentity,
    pub polygons: usize,
    pub buildings: usize,
}

/// Bidirectional client <-> polygon index over one boundary store.
///
/// Built from scratch; there is no incremental update. Every polygon with a
/// resolvable identity sits in exactly one bucket, polygons without one sit in
/// none, and all polygons are kept in ingestion order for click attribution.
#[derive(Debug, Default, Clone)]
pub struct GeometryIndex {
    by_client: BTreeMap<ClientIdentity, Vec<FeatureId>>,
    by_feature: HashMap<FeatureId, ClientIdentity>,
    polygons: Vec<FeatureId>,
}

impl GeometryIndex {
    pub fn build(store: &FeatureStore) -> Self {
        let mut index = Self::default();
        for feature in store.iter() {
            if feature.kind() != GeometryKind::Polygon {
                continue;
            }
            index.polygons.push(feature.id);

            let Some(client) = extract_client_identity(&feature.attributes) else {
                tracing::debug!(feature = feature.id.0, "polygon without client identity");
                continue;
            };
            index
                .by_client
                .entry(client.clone())
                .or_default()
                .push(feature.id);
            index.by_feature.insert(feature.id, client);
        }
        tracing::info!(
            polygons = index.polygons.len(),
            clients = index.by_client.len(),
            "geometry index built"
        );
        index
    }

    pub fn client_of(&self, feature: FeatureId) -> Option<&ClientIdentity> {
        self.by_feature.get(&feature)
    }

    /// Polygons of `client` in ingestion order; empty for unknown clients.
    pub fn features_of(&self, client: &str) -> &[FeatureId] {
        self.by_client
            .get(&ClientIdentity::new(client))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_client(&self, client: &str) -> bool {
        self.by_client.contains_key(&ClientIdentity::new(client))
    }

    /// Every polygon in the store, attributed or not, in ingestion order.
    pub fn polygons(&self) -> &[FeatureId] {
        &self.polygons
    }

    /// Client names, sorted.
    pub fn clients(&self) -> impl Iterator<Item = &ClientIdentity> {
        self.by_client.keys()
    }

    pub fn client_count(&self) -> usize {
        self.by_client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }

    /// Clients whose name contains `query`, ignoring case. An empty query matches all.
    pub fn search<'a>(&'a self, query: &str) -> Vec<&'a ClientIdentity> {
        let needle = query.trim().to_lowercase();
        self.clients()
            .filter(|c| needle.is_empty() || c.as_str().to_lowercase().contains(&needle))
            .collect()
    }

    pub fn first_match(&self, query: &str) -> Option<&ClientIdentity> {
        self.search(query).into_iter().next()
    }

    pub fn summaries(&self, buildings: Option<&BuildingIndex>) -> Vec<ClientSummary> {
        self.by_client
            .iter()
            .map(|(client, polygons)| ClientSummary {
                client: client.clone(),
                polygons: polygons.len(),
                buildings: buildings.map_or(0, |b| b.count_for(client)),
            })
            .collect()
    }
}
