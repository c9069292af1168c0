//! Diesel schema for reviewer assignment persistence.

diesel::table! {
    /// Teams keyed by name.
    teams (team_name) {
        /// Unique team name.
        #[max_length = 255]
        team_name -> Varchar,
    }
}

diesel::table! {
    /// Users and their team membership.
    users (user_id) {
        /// Externally supplied user identifier.
        #[max_length = 255]
        user_id -> Varchar,
        /// Display name.
        #[max_length = 255]
        username -> Varchar,
        /// Team the user belongs to.
        #[max_length = 255]
        team_name -> Varchar,
        /// Whether the user may be picked as a reviewer.
        is_active -> Bool,
    }
}

diesel::table! {
    /// Pull request records.
    pull_requests (pull_request_id) {
        /// Externally supplied pull request identifier.
        #[max_length = 255]
        pull_request_id -> Varchar,
        /// Pull request title.
        #[max_length = 255]
        pull_request_name -> Varchar,
        /// Author user identifier.
        #[max_length = 255]
        author_id -> Varchar,
        /// Lifecycle status (`OPEN` or `MERGED`).
        #[max_length = 16]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Merge timestamp, set once.
        merged_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Reviewer assignments.
    pull_request_reviewers (pull_request_id, reviewer_id) {
        /// Assigned pull request.
        #[max_length = 255]
        pull_request_id -> Varchar,
        /// Assigned reviewer.
        #[max_length = 255]
        reviewer_id -> Varchar,
        /// Assignment timestamp, used for ordering.
        assigned_at -> Timestamptz,
    }
}

diesel::joinable!(users -> teams (team_name));
diesel::joinable!(pull_request_reviewers -> pull_requests (pull_request_id));
diesel::joinable!(pull_request_reviewers -> users (reviewer_id));

diesel::allow_tables_to_appear_in_same_query!(teams, users, pull_requests, pull_request_reviewers);
