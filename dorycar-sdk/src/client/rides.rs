//! Ride API client.
//!
//! Every request carries the caller's bearer token in the `Authorization`
//! header. Tokens are issued elsewhere; the client only forwards them.

use reqwest::{Client, RequestBuilder};
use url::Url;
use uuid::Uuid;

use super::{ClientError, endpoint, parse_response};
use crate::objects::{
    CancelRideRequest, CreateRideRequest, MyRidesResponse, PostMessageRequest,
    PublicRideResponse, RideMessageResponse, RideResponse, RideSearchQuery, ReviewOutcome,
    SubmitReviewRequest,
};

/// Typed HTTP client for the `/api/rides` actions.
#[derive(Debug, Clone)]
pub struct RideClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl RideClient {
    /// Create a new `RideClient`.
    ///
    /// * `base_url` – root URL of the Dorycar server. A path prefix such as
    ///   `https://host/carpool/` is kept in front of every endpoint.
    /// * `token` – the bearer token identifying the acting user.
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    /// `POST /api/rides` – publish a new ride.
    pub async fn create_ride(&self, body: &CreateRideRequest) -> Result<RideResponse, ClientError> {
        let url = endpoint(&self.base_url, "api/rides")?;
        let resp = self.authorized(self.http.post(url)).json(body).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/rides` – search rides.
    pub async fn search_rides(
        &self,
        query: &RideSearchQuery,
    ) -> Result<Vec<PublicRideResponse>, ClientError> {
        let mut url = endpoint(&self.base_url, "api/rides")?;
        url.set_query(Some(&search_query_string(query)));
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/rides/mine` – rides the caller created or joined.
    pub async fn my_rides(&self) -> Result<MyRidesResponse, ClientError> {
        let url = endpoint(&self.base_url, "api/rides/mine")?;
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/rides/{ride_id}`
    pub async fn get_ride(&self, ride_id: Uuid) -> Result<RideResponse, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}"))?;
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/rides/{ride_id}/interest`
    pub async fn express_interest(&self, ride_id: Uuid) -> Result<RideResponse, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/interest"))?;
        let resp = self.authorized(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/rides/{ride_id}/accept/{user_id}` – creator only.
    pub async fn accept_participant(
        &self,
        ride_id: Uuid,
        user_id: Uuid,
    ) -> Result<RideResponse, ClientError> {
        let url = endpoint(
            &self.base_url,
            &format!("api/rides/{ride_id}/accept/{user_id}"),
        )?;
        let resp = self.authorized(self.http.post(url)).send().await?;
        parse_response(resp).await
    }

    /// `PUT /api/rides/{ride_id}/start` – creator only.
    pub async fn start_ride(&self, ride_id: Uuid) -> Result<RideResponse, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/start"))?;
        let resp = self.authorized(self.http.put(url)).send().await?;
        parse_response(resp).await
    }

    /// `PUT /api/rides/{ride_id}/complete` – creator only.
    pub async fn complete_ride(&self, ride_id: Uuid) -> Result<RideResponse, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/complete"))?;
        let resp = self.authorized(self.http.put(url)).send().await?;
        parse_response(resp).await
    }

    /// `PUT /api/rides/{ride_id}/cancel`
    pub async fn cancel_ride(
        &self,
        ride_id: Uuid,
        reason: Option<String>,
    ) -> Result<RideResponse, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/cancel"))?;
        let body = CancelRideRequest {
            cancellation_reason: reason,
        };
        let resp = self
            .authorized(self.http.put(url))
            .json(&body)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/rides/{ride_id}/review`
    pub async fn submit_review(
        &self,
        ride_id: Uuid,
        body: &SubmitReviewRequest,
    ) -> Result<ReviewOutcome, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/review"))?;
        let resp = self.authorized(self.http.post(url)).json(body).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/rides/{ride_id}/messages`
    pub async fn messages(&self, ride_id: Uuid) -> Result<Vec<RideMessageResponse>, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/messages"))?;
        let resp = self.authorized(self.http.get(url)).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/rides/{ride_id}/messages`
    pub async fn post_message(
        &self,
        ride_id: Uuid,
        content: impl Into<String>,
    ) -> Result<RideMessageResponse, ClientError> {
        let url = endpoint(&self.base_url, &format!("api/rides/{ride_id}/messages"))?;
        let body = PostMessageRequest {
            content: content.into(),
        };
        let resp = self
            .authorized(self.http.post(url))
            .json(&body)
            .send()
            .await?;
        parse_response(resp).await
    }
}

fn search_query_string(query: &RideSearchQuery) -> String {
    let mut pairs = Vec::new();
    if let Some(origin) = &query.origin {
        pairs.push(format!("origin={}", urlencoding::encode(origin)));
    }
    if let Some(destination) = &query.destination {
        pairs.push(format!("destination={}", urlencoding::encode(destination)));
    }
    if let Some(date) = &query.date {
        pairs.push(format!("date={}", urlencoding::encode(date)));
    }
    if query.include_closed {
        pairs.push("include_closed=true".to_string());
    }
    pairs.join("&")
}
