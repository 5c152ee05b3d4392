diesel::table! {
    alerts (id) {
        id -> Uuid,
        #[max_length = 255]
        title -> Varchar,
        job_seeker_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    applications (id) {
        id -> Uuid,
        #[max_length = 255]
        cv -> Varchar,
        #[max_length = 16]
        status -> Varchar,
        reject_reason -> Nullable<Text>,
        meeting_date -> Nullable<Timestamptz>,
        job_id -> Uuid,
        job_seeker_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    job_providers (id) {
        id -> Uuid,
        #[max_length = 50]
        name -> Varchar,
        date_of_startup -> Date,
        fields -> Array<Text>,
        #[max_length = 100]
        bio -> Varchar,
        #[max_length = 255]
        email -> Nullable<Varchar>,
        #[max_length = 500]
        company_description -> Varchar,
        #[max_length = 255]
        profile_image -> Nullable<Varchar>,
        address -> Text,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        is_approved -> Bool,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    job_seekers (id) {
        id -> Uuid,
        #[max_length = 50]
        name -> Varchar,
        date_of_birth -> Date,
        #[max_length = 8]
        gender -> Varchar,
        #[max_length = 500]
        bio -> Varchar,
        #[max_length = 255]
        email -> Nullable<Varchar>,
        skills -> Text,
        languages -> Array<Text>,
        #[max_length = 255]
        profile_image -> Nullable<Varchar>,
        cvs -> Array<Text>,
        address -> Text,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    jobs (id) {
        id -> Uuid,
        #[max_length = 255]
        title -> Varchar,
        salary -> Int8,
        deadline -> Timestamptz,
        #[max_length = 16]
        job_type -> Varchar,
        description -> Text,
        qualifications -> Text,
        job_provider_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        job_seeker_id -> Uuid,
        job_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        #[max_length = 255]
        email -> Varchar,
        #[max_length = 255]
        password_hash -> Varchar,
        #[max_length = 16]
        role -> Varchar,
        #[max_length = 32]
        phone -> Nullable<Varchar>,
        is_verified -> Bool,
        #[max_length = 64]
        reset_password_hash -> Nullable<Varchar>,
        reset_password_expires_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(job_providers -> users (user_id));
diesel::joinable!(job_seekers -> users (user_id));
diesel::joinable!(alerts -> job_seekers (job_seeker_id));
diesel::joinable!(applications -> job_seekers (job_seeker_id));
diesel::joinable!(notifications -> job_seekers (job_seeker_id));
diesel::joinable!(jobs -> job_providers (job_provider_id));

diesel::allow_tables_to_appear_in_same_query!(
    alerts,
    applications,
    job_providers,
    job_seekers,
    jobs,
    notifications,
    users,
);
