//! Firestore REST client and typed value codec

use crate::backend::{CollectionPath, Document, DocumentData, Snapshot};
use crate::error::{AppError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Document {
        let id = self.name.rsplit('/').next().unwrap_or_default();
        Document {
            id: urlencoding::decode(id)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| id.to_string()),
            data: decode_fields(&self.fields),
        }
    }
}

/// Firestore documents API for one project
pub struct FirestoreClient {
    client: Client,
    project_id: String,
}

impl FirestoreClient {
    pub fn new(client: Client, project_id: String) -> Self {
        Self { client, project_id }
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_URL, self.project_id
        )
    }

    fn collection_url(&self, path: &CollectionPath) -> String {
        format!("{}/{}", self.documents_root(), path)
    }

    fn document_url(&self, path: &CollectionPath, id: &str) -> String {
        format!("{}/{}", self.collection_url(path), urlencoding::encode(id))
    }

    /// Read every document in a collection, following page tokens
    pub async fn list(&self, id_token: &str, path: &CollectionPath) -> Result<Snapshot> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(self.collection_url(path)).bearer_auth(id_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::send(request, "list", path).await?;
            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents.into_iter().map(RawDocument::into_document));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Snapshot { documents })
    }

    /// Create or replace a document
    pub async fn patch(
        &self,
        id_token: &str,
        path: &CollectionPath,
        id: &str,
        data: &DocumentData,
    ) -> Result<()> {
        debug!("Firestore upsert {}", path.document(id));
        let request = self
            .client
            .patch(self.document_url(path, id))
            .bearer_auth(id_token)
            .json(&json!({ "fields": encode_fields(data) }));

        Self::send(request, "upsert", path).await?;
        Ok(())
    }

    pub async fn delete(&self, id_token: &str, path: &CollectionPath, id: &str) -> Result<()> {
        debug!("Firestore delete {}", path.document(id));
        let request = self
            .client
            .delete(self.document_url(path, id))
            .bearer_auth(id_token);

        Self::send(request, "delete", path).await?;
        Ok(())
    }

    async fn send(request: RequestBuilder, action: &str, path: &CollectionPath) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Firestore {} on {} failed {}: {}", action, path, status, body);
        Err(AppError::Backend(format!(
            "Firestore {} failed (status: {})",
            action,
            status.as_u16()
        )))
    }
}

/// Plain JSON fields to Firestore typed values
pub fn encode_fields(data: &DocumentData) -> Value {
    Value::Object(
        data.iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

/// Firestore typed values to plain JSON fields
pub fn decode_fields(fields: &Map<String, Value>) -> DocumentData {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "booleanValue" | "doubleValue" => {
            inner.clone()
        }
        // Int64 travels as a decimal string
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fields() {
        let mut data = DocumentData::new();
        data.insert("name".to_string(), json!("Apple Inc"));
        data.insert("shares".to_string(), json!(10));
        data.insert("price".to_string(), json!(189.5));
        data.insert("active".to_string(), json!(true));

        let encoded = encode_fields(&data);
        assert_eq!(encoded["name"], json!({ "stringValue": "Apple Inc" }));
        assert_eq!(encoded["shares"], json!({ "integerValue": "10" }));
        assert_eq!(encoded["price"], json!({ "doubleValue": 189.5 }));
        assert_eq!(encoded["active"], json!({ "booleanValue": true }));
    }

    #[test]
    fn test_decode_nested_values() {
        let fields = json!({
            "name": { "stringValue": "Microsoft" },
            "count": { "integerValue": "3" },
            "tags": { "arrayValue": { "values": [{ "stringValue": "tech" }] } },
            "meta": { "mapValue": { "fields": { "ok": { "booleanValue": false } } } },
            "empty": { "arrayValue": {} },
            "missing": { "nullValue": null }
        });

        let decoded = decode_fields(fields.as_object().unwrap());
        assert_eq!(decoded["name"], "Microsoft");
        assert_eq!(decoded["count"], 3);
        assert_eq!(decoded["tags"], json!(["tech"]));
        assert_eq!(decoded["meta"], json!({ "ok": false }));
        assert_eq!(decoded["empty"], json!([]));
        assert!(decoded["missing"].is_null());
    }

    #[test]
    fn test_list_response_into_documents() {
        let body = json!({
            "documents": [{
                "name": "projects/p/databases/(default)/documents/artifacts/app/users/u/watchlist/BRK.B",
                "fields": { "name": { "stringValue": "Berkshire Hathaway" } }
            }]
        });

        let page: ListDocumentsResponse = serde_json::from_value(body).unwrap();
        let docs: Vec<Document> = page.documents.into_iter().map(RawDocument::into_document).collect();
        assert_eq!(docs[0].id, "BRK.B");
        assert_eq!(docs[0].data["name"], "Berkshire Hathaway");
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_empty_collection_response() {
        let page: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
    }

    #[test]
    fn test_document_url_escapes_id() {
        let client = FirestoreClient::new(Client::new(), "demo".to_string());
        let path = CollectionPath::watchlist("app", "u1");
        assert_eq!(
            client.document_url(&path, "A B"),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/artifacts/app/users/u1/watchlist/A%20B"
        );
    }
}
