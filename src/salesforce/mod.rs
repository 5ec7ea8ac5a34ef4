pub mod api;

use crate::cli::globals::GlobalArgs;
use crate::errors::{Error, Result};
use api::{AccessLevel, PermissionSet, SalesforceApi, API_VERSION};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// An authenticated Salesforce session.
///
/// Obtained once via [`Session::login`] and shared read-only for the rest of
/// the run; every vendor call goes out with its session id.
pub struct Session {
    client: Client,
    instance_url: String,
    session_id: SecretString,
}

/// Outcome of a single HTTP exchange, before it is mapped to an
/// operation-specific [`Error`] variant by the caller.
enum RequestError {
    /// Already a definitive error: invalid session or vendor outage.
    Fatal(Error),
    /// The vendor rejected this particular request; the caller decides what
    /// that means for the operation it was performing.
    Rejected(String),
}

impl RequestError {
    fn transport(err: reqwest::Error) -> Self {
        Self::Fatal(Error::VendorUnavailable(err.to_string()))
    }

    fn into_op(self, op: impl FnOnce(String) -> Error) -> Error {
        match self {
            Self::Fatal(err) => err,
            Self::Rejected(reason) => op(reason),
        }
    }
}

/// First error message out of a Salesforce REST error body, which is an
/// array of `{"message": ..., "errorCode": ...}` objects.
fn error_message(body: &Value) -> String {
    body.get(0)
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .unwrap_or("")
        .to_string()
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Content of the first `<tag>...</tag>` element, namespace prefixes ignored.
fn extract_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

/// Escape a value for interpolation into a SOQL string literal.
fn soql_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Instance base URL derived from the `serverUrl` returned by SOAP login.
fn instance_url(server_url: &str) -> Result<String> {
    let url = url::Url::parse(server_url)
        .map_err(|e| Error::Authentication(format!("invalid serverUrl in login response: {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| Error::Authentication("serverUrl has no host".to_string()))?;

    Ok(format!("https://{host}"))
}

fn login_request_body(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <urn:login>
      <urn:username>{}</urn:username>
      <urn:password>{}</urn:password>
    </urn:login>
  </soapenv:Body>
</soapenv:Envelope>"#,
        xml_escape(username),
        xml_escape(password)
    )
}

impl Session {
    /// Authenticate against the SOAP login endpoint.
    ///
    /// The security token is appended to the password, matching what the
    /// vendor expects for username/password logins. No retry; a rejected
    /// login is fatal to the run.
    #[instrument(skip(globals), fields(username = %globals.username, domain = %globals.domain))]
    pub async fn login(globals: &GlobalArgs) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .map_err(|e| Error::VendorUnavailable(e.to_string()))?;

        let login_url = format!(
            "https://{}.salesforce.com/services/Soap/u/{API_VERSION}",
            globals.domain
        );

        let password = format!(
            "{}{}",
            globals.password.expose_secret(),
            globals.security_token.expose_secret()
        );

        let response = client
            .post(&login_url)
            .header(header::CONTENT_TYPE, "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(login_request_body(&globals.username, &password))
            .send()
            .await
            .map_err(|e| Error::VendorUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::VendorUnavailable(e.to_string()))?;

        if !status.is_success() {
            let fault = extract_tag(&body, "faultstring").unwrap_or("login rejected");
            return Err(Error::Authentication(format!("{status}, {fault}")));
        }

        let session_id = extract_tag(&body, "sessionId")
            .ok_or_else(|| Error::Authentication("no sessionId in login response".to_string()))?;

        let server_url = extract_tag(&body, "serverUrl")
            .ok_or_else(|| Error::Authentication("no serverUrl in login response".to_string()))?;

        let instance_url = instance_url(server_url)?;

        info!("connected to {}", instance_url);

        Ok(Self {
            client,
            instance_url,
            session_id: SecretString::from(session_id.to_string()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/services/data/v{API_VERSION}{path}", self.instance_url)
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Value, RequestError> {
        let response = request
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.session_id.expose_secret()),
            )
            .send()
            .await
            .map_err(RequestError::transport)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let body: Value = response.json().await.map_err(RequestError::transport)?;

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body);
        if status == StatusCode::UNAUTHORIZED {
            return Err(RequestError::Fatal(Error::Authentication(format!(
                "{status}, {message}"
            ))));
        }
        if status.is_server_error() {
            return Err(RequestError::Fatal(Error::VendorUnavailable(format!(
                "{status}, {message}"
            ))));
        }

        Err(RequestError::Rejected(format!("{status}, {message}")))
    }

    /// Run a SOQL query, following `nextRecordsUrl` until the result set is
    /// complete.
    async fn query(&self, soql: &str) -> std::result::Result<Vec<Value>, RequestError> {
        let mut records = Vec::new();

        let mut page = self
            .send(self.client.get(self.endpoint("/query")).query(&[("q", soql)]))
            .await?;

        loop {
            if let Some(batch) = page["records"].as_array() {
                records.extend(batch.iter().cloned());
            }

            if page["done"].as_bool().unwrap_or(true) {
                break;
            }

            let Some(next) = page["nextRecordsUrl"].as_str() else {
                break;
            };

            let next_url = format!("{}{next}", self.instance_url);
            page = self.send(self.client.get(&next_url)).await?;
        }

        debug!("query returned {} records", records.len());

        Ok(records)
    }

    async fn create_record(
        &self,
        sobject: &str,
        body: &Value,
    ) -> std::result::Result<Value, RequestError> {
        let url = self.endpoint(&format!("/sobjects/{sobject}"));
        self.send(self.client.post(&url).json(body)).await
    }

    async fn update_record(
        &self,
        sobject: &str,
        id: &str,
        body: &Value,
    ) -> std::result::Result<(), RequestError> {
        let url = self.endpoint(&format!("/sobjects/{sobject}/{id}"));
        self.send(self.client.patch(&url).json(body)).await?;
        Ok(())
    }

    /// Remaining/maximum daily API requests, from the org limits endpoint.
    pub async fn api_usage(&self) -> Result<(u64, u64)> {
        let limits = self
            .send(self.client.get(self.endpoint("/limits")))
            .await
            .map_err(|e| e.into_op(Error::VendorUnavailable))?;

        let daily = &limits["DailyApiRequests"];

        let remaining = daily["Remaining"].as_u64().ok_or_else(|| {
            Error::VendorUnavailable("no DailyApiRequests in limits response".to_string())
        })?;
        let max = daily["Max"].as_u64().ok_or_else(|| {
            Error::VendorUnavailable("no DailyApiRequests in limits response".to_string())
        })?;

        Ok((remaining, max))
    }
}

#[async_trait]
impl SalesforceApi for Session {
    #[instrument(skip(self))]
    async fn list_objects(&self, custom_only: bool) -> Result<Vec<String>> {
        let describe = self
            .send(self.client.get(self.endpoint("/sobjects/")))
            .await
            .map_err(|e| e.into_op(Error::VendorUnavailable))?;

        let objects: Vec<String> = describe["sobjects"]
            .as_array()
            .map(|sobjects| {
                sobjects
                    .iter()
                    .filter(|o| !custom_only || o["custom"].as_bool().unwrap_or(false))
                    .filter_map(|o| o["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        info!("found {} objects", objects.len());

        Ok(objects)
    }

    async fn find_permission_set(&self, name: &str) -> Result<Option<PermissionSet>> {
        let soql = format!(
            "SELECT Id, Name FROM PermissionSet WHERE Name = '{}'",
            soql_quote(name)
        );

        let records = self.query(&soql).await.map_err(|e| {
            e.into_op(|reason| Error::PermissionSetCreation {
                name: name.to_string(),
                reason,
            })
        })?;

        Ok(records.first().and_then(|record| {
            Some(PermissionSet {
                id: record["Id"].as_str()?.to_string(),
                name: name.to_string(),
            })
        }))
    }

    async fn create_permission_set(
        &self,
        name: &str,
        label: &str,
        description: &str,
    ) -> Result<PermissionSet> {
        let body = json!({
            "Name": name,
            "Label": label,
            "Description": description,
        });

        let created = self.create_record("PermissionSet", &body).await.map_err(|e| {
            e.into_op(|reason| Error::PermissionSetCreation {
                name: name.to_string(),
                reason,
            })
        })?;

        let id = created["id"]
            .as_str()
            .ok_or_else(|| Error::PermissionSetCreation {
                name: name.to_string(),
                reason: "no id in create response".to_string(),
            })?;

        info!("created permission set {}", name);

        Ok(PermissionSet {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    async fn set_field_permission(
        &self,
        set: &PermissionSet,
        object: &str,
        field: &str,
        access: AccessLevel,
    ) -> Result<()> {
        let qualified = format!("{object}.{field}");

        let soql = format!(
            "SELECT Id FROM FieldPermissions WHERE ParentId = '{}' AND Field = '{}'",
            soql_quote(&set.id),
            soql_quote(&qualified)
        );

        let existing = self.query(&soql).await.map_err(|e| {
            e.into_op(|reason| Error::FieldPermission {
                field: qualified.clone(),
                reason,
            })
        })?;

        let access_body = json!({
            "PermissionsRead": true,
            "PermissionsEdit": access == AccessLevel::Edit,
        });

        match existing.first().and_then(|r| r["Id"].as_str()) {
            Some(id) => {
                self.update_record("FieldPermissions", id, &access_body)
                    .await
                    .map_err(|e| {
                        e.into_op(|reason| Error::FieldPermission {
                            field: qualified.clone(),
                            reason,
                        })
                    })?;

                debug!("updated field permission for {}", qualified);
            }
            None => {
                let mut body = access_body;
                body["Field"] = json!(qualified);
                body["SobjectType"] = json!(object);
                body["ParentId"] = json!(set.id);

                self.create_record("FieldPermissions", &body)
                    .await
                    .map_err(|e| {
                        e.into_op(|reason| Error::FieldPermission {
                            field: qualified.clone(),
                            reason,
                        })
                    })?;

                debug!("created field permission for {}", qualified);
            }
        }

        Ok(())
    }

    async fn associate_record_type(
        &self,
        set: &PermissionSet,
        object: &str,
        record_type: &str,
    ) -> Result<()> {
        let soql = format!(
            "SELECT Id FROM RecordType WHERE SObjectType = '{}' AND DeveloperName = '{}'",
            soql_quote(object),
            soql_quote(record_type)
        );

        let records = self
            .query(&soql)
            .await
            .map_err(|e| e.into_op(Error::VendorUnavailable))?;

        let Some(id) = records.first().and_then(|r| r["Id"].as_str()) else {
            return Err(Error::VendorUnavailable(format!(
                "record type {record_type} not found on {object}"
            )));
        };

        debug!(
            "associated record type {} ({}) with permission set {}",
            record_type, id, set.name
        );

        Ok(())
    }

    async fn describe_fields(&self, object: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&format!("/sobjects/{object}/describe"));

        let describe = self
            .send(self.client.get(&url))
            .await
            .map_err(|e| e.into_op(Error::VendorUnavailable))?;

        Ok(describe["fields"]
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn record_types(&self, object: &str) -> Result<Vec<String>> {
        let soql = format!(
            "SELECT Id, Name, DeveloperName FROM RecordType WHERE SObjectType = '{}'",
            soql_quote(object)
        );

        let records = self
            .query(&soql)
            .await
            .map_err(|e| e.into_op(Error::VendorUnavailable))?;

        Ok(records
            .iter()
            .filter_map(|r| r["DeveloperName"].as_str().map(String::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tag() {
        let xml = "<ns:result><sessionId>00Dabc!xyz</sessionId><serverUrl>https://na1.salesforce.com/services/Soap/u/59.0/00Dabc</serverUrl></ns:result>";
        assert_eq!(extract_tag(xml, "sessionId"), Some("00Dabc!xyz"));
        assert_eq!(
            extract_tag(xml, "serverUrl"),
            Some("https://na1.salesforce.com/services/Soap/u/59.0/00Dabc")
        );
        assert_eq!(extract_tag(xml, "faultstring"), None);
    }

    #[test]
    fn test_extract_tag_unclosed() {
        assert_eq!(extract_tag("<sessionId>oops", "sessionId"), None);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape("p&ss<w>ord\"'"),
            "p&amp;ss&lt;w&gt;ord&quot;&apos;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_soql_quote() {
        assert_eq!(soql_quote("O'Brien"), "O\\'Brien");
        assert_eq!(soql_quote("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_instance_url() {
        let derived =
            instance_url("https://na139.salesforce.com/services/Soap/u/59.0/00D123").unwrap();
        assert_eq!(derived, "https://na139.salesforce.com");

        assert!(instance_url("not a url").is_err());
    }

    #[test]
    fn test_error_message_shapes() {
        let array = serde_json::json!([{"message": "invalid field", "errorCode": "INVALID_FIELD"}]);
        assert_eq!(error_message(&array), "invalid field");

        let object = serde_json::json!({"message": "bad request"});
        assert_eq!(error_message(&object), "bad request");

        assert_eq!(error_message(&serde_json::json!({})), "");
    }

    #[test]
    fn test_login_request_body_escapes_credentials() {
        let body = login_request_body("user@example.com", "hunter<2>&token");
        assert!(body.contains("<urn:username>user@example.com</urn:username>"));
        assert!(body.contains("<urn:password>hunter&lt;2&gt;&amp;token</urn:password>"));
    }
}
