/// Generate an id for a locally created cart line.
///
/// Guest lines keep this id for their whole life. Optimistic account
/// lines carry it only until the server response replaces the cart.
pub fn new_line_id() -> String {
    format!("local-{}", uuid::Uuid::new_v4().simple())
}

/// Generate a guest session id (one per service instance)
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether an id was generated locally by [`new_line_id`]
pub fn is_local_id(id: &str) -> bool {
    id.starts_with("local-")
}
