//! Teach the utoipa derive macros that the ID type aliases in
//! `src/types.rs` are UUIDs, so `ToSchema` fields typed with an alias
//! get the uuid schema instead of requiring `impl ToSchema for Uuid`.

use utoipa_config::Config;

fn main() {
    Config::new()
        .alias_for("UserId", "Uuid")
        .alias_for("CityId", "Uuid")
        .alias_for("SetId", "Uuid")
        .alias_for("CommentId", "Uuid")
        .alias_for("ContentId", "Uuid")
        .alias_for("ContactMessageId", "Uuid")
        .alias_for("ActivityLogId", "Uuid")
        .alias_for("PlanId", "Uuid")
        .alias_for("TaskId", "Uuid")
        .alias_for("PostId", "Uuid")
        .alias_for("VariantId", "Uuid")
        .alias_for("JobId", "Uuid")
        .alias_for("CharacterId", "Uuid")
        .write_to_file();
    println!("cargo:rerun-if-changed=src/types.rs");
}
