//! EventSub subscription management:
//!  - create (webhook transport)
//!  - delete by id
//!  - list, optionally filtered by type or status, following pagination

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::helix::HelixClient;
use crate::models::{Condition, Subscription};
use crate::Error;

const SUBSCRIPTIONS_PATH: &str = "eventsub/subscriptions";

#[derive(Debug, Serialize)]
struct CreateSubscriptionBody<'a> {
    #[serde(rename = "type")]
    sub_type: &'a str,
    version: &'a str,
    condition: &'a Condition,
    transport: WebhookTransportBody<'a>,
}

#[derive(Debug, Serialize)]
struct WebhookTransportBody<'a> {
    method: &'static str,
    callback: &'a str,
    secret: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionsResponse {
    #[serde(default)]
    data: Vec<Subscription>,
    #[serde(default)]
    pagination: Pagination,
}

/// Narrows a subscription listing. The remote service accepts one filter per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubscriptionFilter {
    #[default]
    All,
    Type(String),
    Status(String),
}

impl SubscriptionFilter {
    fn query(&self) -> Option<(&'static str, &str)> {
        match self {
            SubscriptionFilter::All => None,
            SubscriptionFilter::Type(t) => Some(("type", t.as_str())),
            SubscriptionFilter::Status(s) => Some(("status", s.as_str())),
        }
    }
}

impl HelixClient {
    /// Creates a webhook subscription. The remote service answers 202 with the
    /// new subscription in `webhook_callback_verification_pending` state.
    pub async fn create_subscription(
        &self,
        sub_type: &str,
        version: &str,
        condition: &Condition,
        callback: &str,
        secret: &str,
    ) -> Result<Subscription, Error> {
        let body = CreateSubscriptionBody {
            sub_type,
            version,
            condition,
            transport: WebhookTransportBody {
                method: "webhook",
                callback,
                secret,
            },
        };

        debug!(
            "[Helix] create_subscription => type='{}' version='{}' condition={:?}",
            sub_type, version, condition
        );

        let request = self.http_client().post(self.url(SUBSCRIPTIONS_PATH)).json(&body);
        let resp = self.authorized(request)?.send().await?;

        let status = resp.status();
        let resp_body = resp.text().await?;
        trace!("[Helix] create_subscription => HTTP {} => body={}", status, resp_body);

        match status {
            StatusCode::ACCEPTED => {}
            StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized { body: resp_body }),
            StatusCode::CONFLICT => {
                return Err(Error::DuplicateSubscription {
                    sub_type: sub_type.to_string(),
                    condition: condition.clone(),
                });
            }
            other => {
                warn!("[Helix] create_subscription => status={} body={}", other, resp_body);
                return Err(Error::UnhandledStatus {
                    status: other.as_u16(),
                    body: resp_body,
                });
            }
        }

        let parsed: SubscriptionsResponse = serde_json::from_str(&resp_body)?;
        let created = parsed.data.into_iter().next().ok_or_else(|| {
            Error::MissingData("create subscription response had no data".to_string())
        })?;

        debug!(
            "[Helix] create_subscription => id='{}' status='{}'",
            created.id, created.status
        );
        Ok(created)
    }

    /// Deletes a subscription by id. 404 means the id is unknown.
    pub async fn delete_subscription(&self, id: &str) -> Result<(), Error> {
        debug!("[Helix] delete_subscription => id='{}'", id);

        let request = self
            .http_client()
            .delete(self.url(SUBSCRIPTIONS_PATH))
            .query(&[("id", id)]);
        let resp = self.authorized(request)?.send().await?;

        let status = resp.status();
        match status {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::SubscriptionNotFound(id.to_string())),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized {
                body: resp.text().await.unwrap_or_default(),
            }),
            other => {
                let body = resp.text().await.unwrap_or_default();
                warn!("[Helix] delete_subscription => status={} body={}", other, body);
                Err(Error::UnhandledStatus {
                    status: other.as_u16(),
                    body,
                })
            }
        }
    }

    /// Lists subscriptions, following `pagination.cursor` until it comes back empty.
    pub async fn list_subscriptions(
        &self,
        filter: &SubscriptionFilter,
    ) -> Result<Vec<Subscription>, Error> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        loop {
            let mut request = self.http_client().get(self.url(SUBSCRIPTIONS_PATH));
            if let Some(pair) = filter.query() {
                request = request.query(&[pair]);
            }
            if let Some(after) = cursor.as_deref() {
                request = request.query(&[("after", after)]);
            }

            let resp = self.authorized(request)?.send().await?;
            let status = resp.status();
            let resp_body = resp.text().await?;

            match status {
                StatusCode::OK => {}
                StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized { body: resp_body }),
                other => {
                    warn!("[Helix] list_subscriptions => status={} body={}", other, resp_body);
                    return Err(Error::UnhandledStatus {
                        status: other.as_u16(),
                        body: resp_body,
                    });
                }
            }

            let parsed: SubscriptionsResponse = serde_json::from_str(&resp_body)?;
            page += 1;
            trace!(
                "[Helix] list_subscriptions => page {} had {} entries",
                page,
                parsed.data.len()
            );
            all.extend(parsed.data);

            match parsed.pagination.cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            "[Helix] list_subscriptions => filter={:?} total={}",
            filter,
            all.len()
        );
        Ok(all)
    }
}
