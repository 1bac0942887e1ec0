use time::OffsetDateTime;

/// One pooled upstream credential. `secret` is the opaque auth cookie value,
/// `team_id` the upstream-side tenant it belongs to.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub secret: String,
    pub team_id: String,
    pub donor: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
