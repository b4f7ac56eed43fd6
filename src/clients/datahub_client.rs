//! DataHub GraphQL client
//!
//! Fetches entity details for Slack unfurls and reads/writes the Slack
//! connection blob.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::core::slack_config::{
    ConnectionStore, SLACK_CONFIG_ID, SLACK_CONFIG_URN, SlackConnection,
};
use crate::errors::SlackError;

const ENTITY_SOCIAL_DETAILS_FRAGMENT: &str = r"
fragment PlatformInfo on DataPlatform {
  properties {
    displayName
    logoUrl
  }
}

fragment TermsInfo on GlossaryTerms {
  terms {
    term {
      properties {
        name
      }
    }
  }
}

fragment OwnershipInfo on Ownership {
  owners {
    owner {
      ... on CorpUser {
        properties {
          displayName
        }
      }
      ... on CorpGroup {
        properties {
          displayName
        }
      }
    }
  }
}

fragment DomainInfo on DomainAssociation {
  domain {
    properties {
      name
    }
  }
}

fragment EntitySocialDetails on Entity {
  urn
  type
  ... on Dataset {
    properties { name description }
    editableProperties { description }
    platform { ...PlatformInfo }
    subTypes { typeNames }
    glossaryTerms { ...TermsInfo }
    ownership { ...OwnershipInfo }
    domain { ...DomainInfo }
  }
  ... on Chart {
    properties { name description }
    editableProperties { description }
    platform { ...PlatformInfo }
    glossaryTerms { ...TermsInfo }
    ownership { ...OwnershipInfo }
    domain { ...DomainInfo }
  }
  ... on Dashboard {
    properties { name description }
    editableProperties { description }
    platform { ...PlatformInfo }
    glossaryTerms { ...TermsInfo }
    ownership { ...OwnershipInfo }
    domain { ...DomainInfo }
  }
  ... on Tag {
    properties { name description }
    ownership { ...OwnershipInfo }
  }
}
";

const ENTITIES_SOCIAL_QUERY: &str = r"
query entitiesSocial($urns: [String!]!) {
  entities(urns: $urns) {
    ...EntitySocialDetails
  }
}
";

const GET_CONNECTION_QUERY: &str = r"query GetSlackConnection($urn: String!) {
  connection(urn: $urn) {
    urn
    details {
      type
      json {
        blob
      }
    }
  }
}";

const UPSERT_CONNECTION_MUTATION: &str = r#"mutation SetSlackConnection($id: String!, $blob: String!) {
  upsertConnection(
    input: {
      id: $id,
      type: JSON,
      platformUrn: "urn:li:dataPlatform:slack",
      json: {blob: $blob}
    }
  ) {
    urn
  }
}"#;

// ============================================================================
// Entity types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySocialDetails {
    pub urn: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub properties: Option<EntityProperties>,
    pub editable_properties: Option<EditableProperties>,
    pub platform: Option<Platform>,
    pub sub_types: Option<SubTypes>,
    pub glossary_terms: Option<GlossaryTerms>,
    pub ownership: Option<Ownership>,
    pub domain: Option<DomainAssociation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntityProperties {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EditableProperties {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Platform {
    pub properties: Option<PlatformProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformProperties {
    pub display_name: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTypes {
    #[serde(default)]
    pub type_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlossaryTerms {
    #[serde(default)]
    pub terms: Vec<TermAssociation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TermAssociation {
    pub term: NamedEntity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DomainAssociation {
    pub domain: NamedEntity,
}

/// An entity whose `properties` carries a `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedEntity {
    pub properties: Option<NameProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NameProperties {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ownership {
    #[serde(default)]
    pub owners: Vec<OwnerAssociation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OwnerAssociation {
    pub owner: Owner,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub properties: Option<OwnerProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProperties {
    pub display_name: Option<String>,
}

/// Source of entity details for unfurls.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    async fn get_entity(&self, urn: &str) -> Result<Option<EntitySocialDetails>, SlackError>;
}

// ============================================================================
// GraphQL transport
// ============================================================================

#[derive(Debug, Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct EntitiesData {
    #[serde(default)]
    entities: Vec<Option<EntitySocialDetails>>,
}

#[derive(Debug, Deserialize)]
struct ConnectionData {
    connection: Option<Connection>,
}

#[derive(Debug, Deserialize)]
struct Connection {
    details: ConnectionDetails,
}

#[derive(Debug, Deserialize)]
struct ConnectionDetails {
    #[serde(rename = "type")]
    details_type: String,
    json: Option<JsonBlob>,
}

#[derive(Debug, Deserialize)]
struct JsonBlob {
    blob: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertConnectionData {
    upsert_connection: UpsertedConnection,
}

#[derive(Debug, Deserialize)]
struct UpsertedConnection {
    urn: String,
}

/// Client for the DataHub GMS GraphQL endpoint.
pub struct DataHubGraph {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl DataHubGraph {
    #[must_use]
    pub fn new(server: &str, token: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            endpoint: format!("{}/api/graphql", server.trim_end_matches('/')),
            token,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the request fails, GraphQL reports errors, or the
    /// response has no `data`.
    pub async fn execute_graphql<T>(&self, query: &str, variables: Value) -> Result<T, SlackError>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&GraphQLRequest { query, variables });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(SlackError::GraphQLError(format!("HTTP {}", resp.status())));
        }

        let body: GraphQLResponse<T> = resp.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(SlackError::GraphQLError(messages.join("; ")));
        }

        body.data
            .ok_or_else(|| SlackError::GraphQLError("response has no data".to_string()))
    }

    /// Returns the JSON blob of a connection, or `None` when it does not
    /// exist or is not a JSON connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the GraphQL call fails.
    pub async fn get_connection(&self, urn: &str) -> Result<Option<String>, SlackError> {
        let data: ConnectionData = self
            .execute_graphql(GET_CONNECTION_QUERY, json!({ "urn": urn }))
            .await?;

        let Some(connection) = data.connection else {
            return Ok(None);
        };

        if !connection.details.details_type.eq_ignore_ascii_case("json") {
            error!(
                "Expected connection details type to be 'json', but got {}",
                connection.details.details_type
            );
            return Ok(None);
        }

        Ok(connection.details.json.map(|j| j.blob))
    }

    /// # Errors
    ///
    /// Returns an error if the GraphQL call fails.
    pub async fn upsert_connection(&self, id: &str, blob: &str) -> Result<String, SlackError> {
        let data: UpsertConnectionData = self
            .execute_graphql(UPSERT_CONNECTION_MUTATION, json!({ "id": id, "blob": blob }))
            .await?;
        Ok(data.upsert_connection.urn)
    }
}

#[async_trait]
impl EntityLookup for DataHubGraph {
    async fn get_entity(&self, urn: &str) -> Result<Option<EntitySocialDetails>, SlackError> {
        let query = format!("{ENTITY_SOCIAL_DETAILS_FRAGMENT}{ENTITIES_SOCIAL_QUERY}");
        let data: EntitiesData = self.execute_graphql(&query, json!({ "urns": [urn] })).await?;

        let entity = data.entities.into_iter().next().flatten();
        debug!(urn, found = entity.is_some(), "Fetched entity social details");
        Ok(entity)
    }
}

#[async_trait]
impl ConnectionStore for DataHubGraph {
    async fn load(&self) -> Result<Option<SlackConnection>, SlackError> {
        match self.get_connection(SLACK_CONFIG_URN).await? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, connection: &SlackConnection) -> Result<(), SlackError> {
        let blob = serde_json::to_string(connection)?;
        let urn = self.upsert_connection(SLACK_CONFIG_ID, &blob).await?;
        if urn != SLACK_CONFIG_URN {
            return Err(SlackError::GraphQLError(format!(
                "upsertConnection returned unexpected urn {urn}"
            )));
        }
        Ok(())
    }
}
