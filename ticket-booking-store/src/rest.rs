use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::models::{EnsuredUser, ItemCollection, UploadedFile};
use crate::query::odata_string;
use crate::{DocumentLibrary, Item, ItemId, ListStore, PeopleService, Query, StoreError, UserId};

const ODATA_JSON: &str = "application/json;odata=nometadata";

/// Talks to the site's REST api. Every request opens its own connection.
pub struct RestStore {
    site_url: Url,
    access_token: Option<String>,
    connector: TlsConnector,
}

impl RestStore {
    pub fn new(site_url: &str, access_token: Option<String>) -> Result<Self, StoreError> {
        let site_url =
            Url::parse(site_url).map_err(|err| StoreError::InvalidUrl(format!("{site_url}: {err}")))?;
        if site_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(site_url.to_string()));
        }

        let mut root_cert_store = RootCertStore::empty();
        root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        Ok(Self {
            site_url,
            access_token,
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    /// `{site}/_api/web/{segments..}?{query}`
    pub fn api_url(&self, segments: &[&str], query: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.site_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidUrl(self.site_url.to_string()))?
            .pop_if_empty()
            .extend(["_api", "web"])
            .extend(segments);
        url.set_query(query);
        Ok(url)
    }

    fn items_segments(list: &str) -> [String; 3] {
        [
            "lists".to_owned(),
            format!("getbytitle({})", odata_string(list)),
            "items".to_owned(),
        ]
    }

    fn item_url(&self, list: &str, id: ItemId) -> Result<Url, StoreError> {
        let [lists, by_title, _] = Self::items_segments(list);
        let item = format!("items({id})");
        self.api_url(&[lists.as_str(), by_title.as_str(), item.as_str()], None)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        extra_headers: &[(&'static str, &'static str)],
        content_type: &str,
        body: Bytes,
    ) -> Result<(StatusCode, Bytes), StoreError> {
        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|_| StoreError::InvalidUrl(url.to_string()))?;
        let host = uri
            .host()
            .ok_or_else(|| StoreError::InvalidUrl(url.to_string()))?
            .to_owned();
        let https = uri.scheme_str() == Some("https");
        let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });
        let authority = uri
            .authority()
            .map_or_else(|| host.clone(), ToString::to_string);
        let path_and_query = uri
            .path_and_query()
            .map_or_else(|| "/".to_owned(), ToString::to_string);

        let mut builder = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header(HOST, authority)
            .header(ACCEPT, ODATA_JSON)
            .header(CONTENT_TYPE, content_type);
        if let Some(token) = &self.access_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Full::new(body))?;

        let stream = TcpStream::connect((host.as_str(), port)).await?;
        let (status, body) = if https {
            let server_name = ServerName::try_from(host.clone())
                .map_err(|_| StoreError::InvalidUrl(url.to_string()))?;
            let stream = self.connector.connect(server_name, stream).await?;
            exchange(TokioIo::new(stream), request).await?
        } else {
            exchange(TokioIo::new(stream), request).await?
        };
        debug!("{} answered {}", url, status);

        if status.is_success() {
            Ok((status, body))
        } else {
            Err(StoreError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<T, StoreError> {
        let body = match body {
            Some(value) => Bytes::from(serde_json::to_vec(value)?),
            None => Bytes::new(),
        };
        let (_, response) = self.send(method, url, &[], ODATA_JSON, body).await?;
        Ok(serde_json::from_slice(&response)?)
    }
}

async fn exchange<I>(io: I, request: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), StoreError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io).await?;
    tokio::task::spawn(async move {
        if let Err(err) = connection.await {
            warn!("connection to the site failed: {err}");
        }
    });

    let response = sender.send_request(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    Ok((status, body))
}

fn not_found_as(error: StoreError, id: ItemId) -> StoreError {
    match error {
        StoreError::Status { status: 404, .. } => StoreError::NotFound(id),
        other => other,
    }
}

#[async_trait]
impl ListStore for RestStore {
    #[instrument(skip(self, query))]
    async fn filter(&self, list: &str, query: &Query) -> Result<Vec<Item>, StoreError> {
        let [lists, by_title, items] = Self::items_segments(list);
        let query_string = query.to_query_string();
        let url = self.api_url(
            &[lists.as_str(), by_title.as_str(), items.as_str()],
            (!query_string.is_empty()).then_some(query_string.as_str()),
        )?;
        let collection: ItemCollection = self.send_json(Method::GET, &url, None).await?;
        Ok(collection.value)
    }

    #[instrument(skip(self, fields))]
    async fn add(&self, list: &str, fields: Item) -> Result<Item, StoreError> {
        let [lists, by_title, items] = Self::items_segments(list);
        let url = self.api_url(&[lists.as_str(), by_title.as_str(), items.as_str()], None)?;
        self.send_json(Method::POST, &url, Some(&serde_json::Value::Object(fields)))
            .await
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, list: &str, id: ItemId, fields: Item) -> Result<(), StoreError> {
        let url = self.item_url(list, id)?;
        let body = Bytes::from(serde_json::to_vec(&fields)?);
        self.send(
            Method::POST,
            &url,
            &[("X-HTTP-Method", "MERGE"), ("IF-MATCH", "*")],
            ODATA_JSON,
            body,
        )
        .await
        .map_err(|err| not_found_as(err, id))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, list: &str, id: ItemId) -> Result<(), StoreError> {
        let url = self.item_url(list, id)?;
        self.send(
            Method::POST,
            &url,
            &[("X-HTTP-Method", "DELETE"), ("IF-MATCH", "*")],
            ODATA_JSON,
            Bytes::new(),
        )
        .await
        .map_err(|err| not_found_as(err, id))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentLibrary for RestStore {
    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn upload(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<String, StoreError> {
        let folder = format!("GetFolderByServerRelativeUrl({})", odata_string(folder));
        let add = format!("add(url={},overwrite={overwrite})", odata_string(name));
        let url = self.api_url(&[folder.as_str(), "Files", add.as_str()], None)?;
        let (_, response) = self
            .send(Method::POST, &url, &[], "application/octet-stream", content)
            .await?;
        let file: UploadedFile = serde_json::from_slice(&response)?;
        Ok(file.server_relative_url)
    }
}

#[async_trait]
impl PeopleService for RestStore {
    #[instrument(skip(self))]
    async fn ensure_user(&self, login: &str) -> Result<UserId, StoreError> {
        let url = self.api_url(&["ensureuser"], None)?;
        let body = serde_json::json!({ "logonName": login });
        match self
            .send_json::<EnsuredUser>(Method::POST, &url, Some(&body))
            .await
        {
            Ok(user) => Ok(user.id),
            Err(StoreError::Status { status: 404, .. }) => {
                Err(StoreError::UserNotFound(login.to_owned()))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RestStore;
    use crate::{Filter, Query, StoreError};

    #[test]
    fn builds_item_urls() -> Result<(), StoreError> {
        let store = RestStore::new("https://contoso.example/sites/TenantPracticeSite/", None)?;
        let url = store.item_url("BusTicketBooking", 7)?;
        assert_eq!(
            url.as_str(),
            "https://contoso.example/sites/TenantPracticeSite/_api/web/lists/getbytitle('BusTicketBooking')/items(7)"
        );
        Ok(())
    }

    #[test]
    fn builds_filter_urls() -> Result<(), StoreError> {
        let store = RestStore::new("https://contoso.example/sites/Travel", None)?;
        let [lists, by_title, items] = RestStore::items_segments("Bus Bookings");
        let query = Query::new().filter(Filter::eq("Phone", "9876543210"));
        let query_string = query.to_query_string();
        let url = store.api_url(
            &[lists.as_str(), by_title.as_str(), items.as_str()],
            Some(&query_string),
        )?;
        assert_eq!(
            url.as_str(),
            "https://contoso.example/sites/Travel/_api/web/lists/getbytitle('Bus%20Bookings')/items?$filter=Phone%20eq%20%279876543210%27"
        );
        Ok(())
    }

    #[test]
    fn rejects_relative_site_urls() {
        assert!(matches!(
            RestStore::new("sites/Travel", None),
            Err(StoreError::InvalidUrl(_))
        ));
    }
}
