use crate::models::{AcademicProfile, UniversityFilter, UniversityRecord};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when reading from the document store
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Collection IDs in the document store
#[derive(Debug, Clone)]
pub struct CatalogCollections {
    pub academic_profiles: String,
    pub universities: String,
}

/// Document store API client
///
/// Reads the two external collections the service depends on:
/// - student academic profiles (written by the profile form)
/// - the university catalog (maintained by administrators)
pub struct CatalogClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: CatalogCollections,
}

impl CatalogClient {
    /// Create a new catalog client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: CatalogCollections,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str, queries: &[String]) -> Result<String, CatalogError> {
        let url = format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        );

        if queries.is_empty() {
            return Ok(url);
        }

        let queries_json = serde_json::to_string(queries)
            .map_err(|e| CatalogError::InvalidResponse(format!("Failed to encode query: {}", e)))?;

        Ok(format!("{}?query={}", url, urlencoding::encode(&queries_json)))
    }

    async fn fetch_documents(&self, url: &str, what: &str) -> Result<Vec<Value>, CatalogError> {
        let response = self
            .client
            .get(url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch {}: {} - {}", what, status, body);
            return Err(CatalogError::ApiError(format!("Failed to fetch {}: {}", what, status)));
        }

        let mut json: Value = response.json().await?;

        match json.get_mut("documents").map(Value::take) {
            Some(Value::Array(documents)) => Ok(documents),
            _ => Err(CatalogError::InvalidResponse("Missing documents array".into())),
        }
    }

    /// Fetch the academic profile for a given user ID
    pub async fn get_profile(&self, user_id: &str) -> Result<AcademicProfile, CatalogError> {
        let queries = vec![format!("equal(\"userId\", [{}])", quote(user_id))];
        let url = self.documents_url(&self.collections.academic_profiles, &queries)?;

        tracing::debug!("Fetching academic profile for user: {}", user_id);

        let documents = self.fetch_documents(&url, "profile").await?;

        let doc = documents
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("Profile not found for user {}", user_id)))?;

        serde_json::from_value(unwrap_data(doc))
            .map_err(|e| CatalogError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }

    /// List universities matching a catalog filter
    ///
    /// Documents that do not parse as a university record are skipped.
    pub async fn list_universities(
        &self,
        filter: &UniversityFilter,
    ) -> Result<Vec<UniversityRecord>, CatalogError> {
        let mut queries = Vec::new();

        if !filter.countries.is_empty() {
            let countries = filter
                .countries
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(",");
            queries.push(format!("equal(\"country\", [{}])", countries));
        }

        if let Some(limit) = filter.limit {
            queries.push(format!("limit({})", limit));
        }

        let url = self.documents_url(&self.collections.universities, &queries)?;
        let documents = self.fetch_documents(&url, "universities").await?;
        let fetched = documents.len();

        let universities: Vec<UniversityRecord> = documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(unwrap_data(doc)) {
                Ok(university) => Some(university),
                Err(e) => {
                    tracing::warn!("Skipping unparseable university document: {}", e);
                    None
                }
            })
            .collect();

        tracing::debug!("Listed {} universities ({} documents)", universities.len(), fetched);

        Ok(universities)
    }
}

/// Documents may carry their fields under a `data` key
fn unwrap_data(mut doc: Value) -> Value {
    match doc.get_mut("data").map(Value::take) {
        Some(data @ Value::Object(_)) => data,
        _ => doc,
    }
}

fn quote(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn create_client(base_url: String) -> CatalogClient {
        CatalogClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            CatalogCollections {
                academic_profiles: "academic_profiles".to_string(),
                universities: "universities".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_catalog_client_creation() {
        let client = create_client("https://store.test/v1/".to_string());

        assert_eq!(client.api_key, "test_key");
        assert_eq!(
            client.documents_url("universities", &[]).unwrap(),
            "https://store.test/v1/databases/test_db/collections/universities/documents"
        );
    }

    #[tokio::test]
    async fn test_get_profile() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/databases/test_db/collections/academic_profiles/documents".to_string()))
            .match_header("X-Appwrite-Key", "test_key")
            .with_status(200)
            .with_body(
                r#"{"total": 1, "documents": [{"$id": "doc1", "userId": "student-1", "cgpa": 3.7, "ieltsScore": 7.5, "preferredCountries": ["Canada"]}]}"#,
            )
            .create_async()
            .await;

        let client = create_client(server.url());
        let profile = client.get_profile("student-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(profile.cgpa, Some(3.7));
        assert_eq!(profile.ielts_score, Some(7.5));
        assert!(profile.preferred_countries.contains("Canada"));
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total": 0, "documents": []}"#)
            .create_async()
            .await;

        let client = create_client(server.url());
        let result = client.get_profile("nobody").await;

        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_universities_skips_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"collections/universities/documents".to_string()))
            .with_status(200)
            .with_body(
                r#"{"total": 2, "documents": [
                    {"data": {"id": "u1", "name": "North University", "country": "Canada", "type": "public", "cgpaRequirement": 3.0}},
                    {"id": "u2", "name": "Missing type"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = create_client(server.url());
        let universities = client
            .list_universities(&UniversityFilter {
                countries: vec!["Canada".to_string()],
                limit: Some(50),
            })
            .await
            .unwrap();

        assert_eq!(universities.len(), 1);
        assert_eq!(universities[0].id, "u1");
    }

    #[tokio::test]
    async fn test_api_error_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message": "unauthorized"}"#)
            .create_async()
            .await;

        let client = create_client(server.url());
        let result = client.list_universities(&UniversityFilter::default()).await;

        assert!(matches!(result, Err(CatalogError::ApiError(_))));
    }
}
