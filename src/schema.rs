// Kept in sync by hand with repository::migrations.
// PRIMARY KEY columns are not nullable

diesel::table! {
    applications (id) {
        id -> Integer,
        user_id -> BigInt,
        posting_id -> Text,
        status -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    platform_profiles (user_id) {
        user_id -> BigInt,
        external_id -> Nullable<Text>,
        access_token -> Text,
        refresh_token -> Text,
        is_bot_active -> Integer,
        updated_at -> Text,
    }
}

diesel::table! {
    search_settings (user_id) {
        user_id -> BigInt,
        resume_id -> Text,
        search_text -> Text,
        area_id -> Text,
        salary -> Nullable<Integer>,
        currency -> Text,
        period -> Integer,
        schedule -> Nullable<Text>,
        employment -> Nullable<Text>,
        order_by -> Text,
        cover_letter -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(applications, platform_profiles, search_settings,);
