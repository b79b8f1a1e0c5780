//! Typed REST endpoints. All of them go through [`ApiClient::execute`]
//! except the credential exchange.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{LoginRequest, LoginResponse};
use super::{ApiClient, ApiError, ApiErrorKind, ApiResult, NewUser, Plan, PlanningPeriod, Profile, User};

impl ApiClient {
    /// Exchanges identifier and secret for an access token.
    ///
    /// # Errors
    /// `CredentialInvalid` for 4xx, `ServerError` for 5xx, `NetworkUnavailable`
    /// on transport failure.
    pub async fn login(&self, identifier: &str, secret: &str) -> ApiResult<String> {
        let request = self
            .request(Method::POST, "/auth/login")
            .json(&LoginRequest { identifier, secret });
        let response = self.execute_unauthenticated(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::credential_invalid(status.as_u16(), &body));
        }

        let payload: LoginResponse = response
            .json()
            .await
            .map_err(|err| ApiError::parse("login", &err))?;
        Ok(payload.access_token)
    }

    /// Fetches the profile of the current credential holder.
    ///
    /// # Errors
    /// `AuthExpired` on 401, a generic profile error on other statuses.
    pub async fn me(&self) -> ApiResult<Profile> {
        let response = self.execute(self.request(Method::GET, "/auth/me")).await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::auth_expired());
        }
        if !status.is_success() {
            return Err(ApiError {
                kind: ApiErrorKind::ServerError,
                status: Some(status.as_u16()),
                message: "Failed to load profile".to_string(),
            });
        }
        response
            .json()
            .await
            .map_err(|err| ApiError::parse("profile", &err))
    }

    /// # Errors
    /// Returns the backend's message on failure.
    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        let response = self.execute(self.request(Method::GET, "/admin/users")).await?;
        decode(response, "users").await
    }

    /// # Errors
    /// Returns the backend's message on failure.
    pub async fn create_user(&self, user: &NewUser) -> ApiResult<User> {
        let request = self.request(Method::POST, "/admin/users").json(user);
        let response = self.execute(request).await?;
        decode(response, "user").await
    }

    /// Lists plans, optionally restricted to one planning period.
    ///
    /// # Errors
    /// Returns the backend's message on failure.
    pub async fn list_plans(&self, planning_period_id: Option<i64>) -> ApiResult<Vec<Plan>> {
        let mut request = self.request(Method::GET, "/plans");
        if let Some(id) = planning_period_id {
            request = request.query(&[("planningPeriodId", id)]);
        }
        let response = self.execute(request).await?;
        decode(response, "plans").await
    }

    /// # Errors
    /// Returns the backend's message on failure.
    pub async fn get_plan(&self, id: i64) -> ApiResult<Plan> {
        let response = self
            .execute(self.request(Method::GET, &format!("/plans/{id}")))
            .await?;
        decode(response, "plan").await
    }

    /// # Errors
    /// Returns the backend's message on failure.
    pub async fn delete_plan(&self, id: i64) -> ApiResult<()> {
        let response = self
            .execute(self.request(Method::DELETE, &format!("/plans/{id}")))
            .await?;
        check(response, "delete plan").await
    }

    /// # Errors
    /// Returns the backend's message on failure.
    pub async fn list_planning_periods(&self) -> ApiResult<Vec<PlanningPeriod>> {
        let response = self
            .execute(self.request(Method::GET, "/planning-periods"))
            .await?;
        decode(response, "planning periods").await
    }
}

async fn check(response: Response, what: &str) -> ApiResult<()> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::auth_expired());
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::http_status(
            status.as_u16(),
            &body,
            &format!("Failed to {what}"),
        ));
    }
    Ok(())
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> ApiResult<T> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::auth_expired());
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::http_status(
            status.as_u16(),
            &body,
            &format!("Failed to load {what}"),
        ));
    }
    response
        .json()
        .await
        .map_err(|err| ApiError::parse(what, &err))
}
