use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthorizationLevel, Authenticator};
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::schemas::{Group, Member, MemberId};

#[derive(Deserialize, Serialize)]
pub struct NewMemberJson {
    pub name: String,
}

#[derive(Deserialize, Serialize)]
pub struct RegisteredMemberJson {
    pub member: Member,
    pub token: String,
}

#[derive(Deserialize, Serialize)]
pub struct TokenJson {
    pub token: String,
}

#[derive(Deserialize, Serialize)]
pub struct NewGroupJson {
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberId>,
}

#[derive(Deserialize, Serialize)]
pub struct NewExpenseJson {
    pub description: String,
    pub amount: f64,
    pub payer: Option<MemberId>,
    pub category: Option<String>,
}

#[derive(Deserialize, Serialize)]
pub struct NewSettlementJson {
    pub payer: Option<MemberId>,
    pub payee: MemberId,
    pub amount: f64,
}

fn authorize(request: &HttpRequest, auth: &Authenticator) -> Result<AuthorizationLevel> {
    auth.check_authorization_level(request)
        .ok_or(LedgerError::Unauthorized)
}

fn require_service(level: &AuthorizationLevel) -> Result<()> {
    match level {
        AuthorizationLevel::Service => Ok(()),
        AuthorizationLevel::Member(_) => Err(LedgerError::Forbidden(
            "this action needs the service token".to_string(),
        )),
    }
}

fn require_member(level: &AuthorizationLevel) -> Result<&str> {
    level
        .member()
        .ok_or_else(|| LedgerError::Forbidden("this action needs a member token".to_string()))
}

/// Loads the group and checks that a member caller belongs to it.
async fn authorized_group(ledger: &Ledger, level: &AuthorizationLevel, id: &str) -> Result<Group> {
    let group = ledger.get_group(id).await?;
    match level.member() {
        Some(member) if !group.has_member(member) => Err(LedgerError::Forbidden(format!(
            "not a member of group {}",
            id
        ))),
        _ => Ok(group),
    }
}

/// The explicit payer if given, otherwise the calling member.
fn resolve_payer(level: &AuthorizationLevel, payer: Option<MemberId>) -> Result<MemberId> {
    payer
        .or_else(|| level.member().map(str::to_string))
        .ok_or_else(|| LedgerError::validation("payer is required"))
}

/// A member token may only record settlements it paid; the service token may name any payer.
fn settlement_payer(level: &AuthorizationLevel, payer: Option<MemberId>) -> Result<MemberId> {
    match (level.member(), payer) {
        (Some(caller), Some(payer)) if caller != payer => Err(LedgerError::Forbidden(
            "members can only record settlements they paid".to_string(),
        )),
        (_, payer) => resolve_payer(level, payer),
    }
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

#[post("/members")]
async fn register_member(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    json: web::Json<NewMemberJson>,
) -> Result<HttpResponse> {
    require_service(&authorize(&request, &auth)?)?;
    let member = ledger.register_member(&json.name).await?;
    let token = auth.issue_token(&member.id);
    Ok(HttpResponse::Created().json(RegisteredMemberJson { member, token }))
}

#[post("/members/{id}/tokens")]
async fn issue_token(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    require_service(&authorize(&request, &auth)?)?;
    let member = ledger.get_member(&id).await?;
    Ok(HttpResponse::Ok().json(TokenJson {
        token: auth.issue_token(&member.id),
    }))
}

#[get("/members")]
async fn list_members(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
) -> Result<HttpResponse> {
    authorize(&request, &auth)?;
    Ok(HttpResponse::Ok().json(ledger.list_members().await?))
}

#[post("/groups")]
async fn create_group(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    json: web::Json<NewGroupJson>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    let group = ledger
        .create_group(&json.name, level.member(), &json.members)
        .await?;
    Ok(HttpResponse::Created().json(group))
}

#[get("/groups")]
async fn list_groups(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    Ok(HttpResponse::Ok().json(ledger.list_groups(level.member()).await?))
}

#[get("/groups/{id}")]
async fn get_group(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    let group = authorized_group(&ledger, &level, &id).await?;
    Ok(HttpResponse::Ok().json(group))
}

#[post("/groups/{id}/join")]
async fn join_group(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    let member = require_member(&level)?;
    Ok(HttpResponse::Ok().json(ledger.join_group(&id, member).await?))
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
    json: web::Json<NewExpenseJson>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    authorized_group(&ledger, &level, &id).await?;
    let json = json.into_inner();
    let payer = resolve_payer(&level, json.payer)?;
    let expense = ledger
        .add_expense(&id, &json.description, json.amount, &payer, json.category)
        .await?;
    Ok(HttpResponse::Created().json(expense))
}

#[get("/groups/{id}/expenses")]
async fn list_expenses(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    authorized_group(&ledger, &level, &id).await?;
    Ok(HttpResponse::Ok().json(ledger.list_expenses(&id).await?))
}

#[get("/groups/{id}/balance")]
async fn get_balance(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    authorized_group(&ledger, &level, &id).await?;
    Ok(HttpResponse::Ok().json(ledger.compute_balances(&id).await?))
}

#[get("/groups/{id}/settlement")]
async fn get_settlement_plan(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    authorized_group(&ledger, &level, &id).await?;
    Ok(HttpResponse::Ok().json(ledger.plan_settlement(&id).await?))
}

#[post("/groups/{id}/settlements")]
async fn record_settlement(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
    json: web::Json<NewSettlementJson>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    authorized_group(&ledger, &level, &id).await?;
    let json = json.into_inner();
    let payer = settlement_payer(&level, json.payer)?;
    let settlement = ledger
        .record_settlement(&id, &payer, &json.payee, json.amount)
        .await?;
    Ok(HttpResponse::Created().json(settlement))
}

#[get("/groups/{id}/summary")]
async fn get_summary(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    authorized_group(&ledger, &level, &id).await?;
    Ok(HttpResponse::Ok().json(ledger.spending_summary(&id).await?))
}

#[get("/notifications")]
async fn list_notifications(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    let member = require_member(&level)?;
    Ok(HttpResponse::Ok().json(ledger.notifications(member).await?))
}

#[put("/notifications/{id}/read")]
async fn mark_notification_read(
    request: HttpRequest,
    ledger: web::Data<Ledger>,
    auth: web::Data<Authenticator>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let level = authorize(&request, &auth)?;
    let member = require_member(&level)?;
    ledger.mark_notification_read(&id, member).await?;
    Ok(HttpResponse::Ok().body("Marked as read"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(register_member)
        .service(issue_token)
        .service(list_members)
        .service(create_group)
        .service(list_groups)
        .service(get_group)
        .service(join_group)
        .service(add_expense)
        .service(list_expenses)
        .service(get_balance)
        .service(get_settlement_plan)
        .service(record_settlement)
        .service(get_summary)
        .service(list_notifications)
        .service(mark_notification_read);
}
