// Mirrors migrations/0001_init.sql.

diesel::table! {
    activations (agent_key) {
        agent_key -> Text,
        ip -> Text,
        labels -> Text,
        activation_sig -> Nullable<Text>,
        hardware_hash -> Nullable<Text>,
        activated_at -> Timestamp,
        updated_at -> Timestamp,
        last_seen_at -> Timestamp,
    }
}

diesel::table! {
    license_info (id) {
        id -> Integer,
        install_id -> Text,
        license_key -> Nullable<Text>,
        max_agents -> Integer,
        status -> Text,
        expires_at -> Nullable<Timestamp>,
        last_heartbeat_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    audit_log (id) {
        id -> Integer,
        action -> Text,
        agent_key -> Nullable<Text>,
        ip -> Nullable<Text>,
        result -> Text,
        details -> Text,
        created_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(activations, license_info, audit_log);
