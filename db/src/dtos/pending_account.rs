use common::email::Email;

pub struct PendingAccountCreateRequest {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
}
