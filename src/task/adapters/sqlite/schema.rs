//! Diesel schema for watch task persistence.

diesel::table! {
    /// Task owners.
    users (id) {
        /// Opaque external user identifier.
        id -> Text,
        /// Display name.
        username -> Text,
        /// Optional contact email.
        email -> Nullable<Text>,
        /// Creation timestamp (RFC 3339).
        created_at -> Text,
        /// Last update timestamp (RFC 3339).
        updated_at -> Text,
    }
}

diesel::table! {
    /// Watch task records.
    tasks (id) {
        /// Generated task identifier.
        id -> Text,
        /// Task name.
        name -> Text,
        /// Owning user.
        user_id -> Text,
        /// JSON array of keywords.
        keywords -> Text,
        /// JSON array of exclusion filters.
        filters -> Text,
        /// JSON array of platform identifiers.
        platforms -> Text,
        /// Report cadence.
        report_mode -> Text,
        /// Optional schedule descriptor.
        schedule -> Nullable<Text>,
        /// Keyword expansion flag.
        expand_keywords -> Bool,
        /// Lifecycle status.
        status -> Text,
        /// Optional description.
        description -> Nullable<Text>,
        /// Creation timestamp (RFC 3339).
        created_at -> Text,
        /// Last update timestamp (RFC 3339).
        updated_at -> Text,
    }
}

diesel::table! {
    /// Append-only execution history.
    task_executions (id) {
        /// Store-assigned sequence.
        id -> BigInt,
        /// Executed task.
        task_id -> Text,
        /// Optional artifact location.
        html_path -> Nullable<Text>,
        /// Matched item count.
        matched_count -> BigInt,
        /// Run duration in milliseconds.
        duration_ms -> BigInt,
        /// Run outcome.
        status -> Text,
        /// Failure description.
        error_message -> Nullable<Text>,
        /// Completion timestamp (RFC 3339).
        executed_at -> Text,
    }
}

diesel::joinable!(tasks -> users (user_id));
diesel::joinable!(task_executions -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(users, tasks, task_executions);
