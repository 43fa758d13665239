//! Common type definitions shared across the crate.
//!
//! All entity IDs are UUIDs wrapped in type aliases for readability:
//! a `SetId` in a signature says more than a bare `Uuid`.

use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type CityId = Uuid;
pub type SetId = Uuid;
pub type CommentId = Uuid;
pub type ContentId = Uuid;
pub type ContactMessageId = Uuid;
pub type ActivityLogId = Uuid;
pub type PlanId = Uuid;
pub type TaskId = Uuid;
pub type PostId = Uuid;
pub type VariantId = Uuid;
pub type JobId = Uuid;
pub type CharacterId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces.
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id: Uuid = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
