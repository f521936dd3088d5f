use uuid::Uuid;

pub const VWO_NAMESPACE_URL: &str = "https://vwo.com";

/// Name-based visitor id shared by every SDK of an account.
///
/// `uuid5(uuid5(uuid5(NAMESPACE_URL, "https://vwo.com"), account_id), user_id)`,
/// rendered as 32 uppercase hex digits without hyphens.
pub fn generate_visitor_uuid(user_id: &str, account_id: &str) -> String {
    let vwo_namespace = Uuid::new_v5(&Uuid::NAMESPACE_URL, VWO_NAMESPACE_URL.as_bytes());
    let account_namespace = Uuid::new_v5(&vwo_namespace, account_id.as_bytes());
    let visitor = Uuid::new_v5(&account_namespace, user_id.as_bytes());
    visitor.simple().to_string().to_uppercase()
}
