pub mod fan_out;
pub mod github_api_helper;
pub mod link_header;
pub mod lookup_cache;
pub mod resource_fetchers;

// Only the fields the report needs are decoded, the API sends many more.

pub(crate) mod org_api_response {
    /// see https://docs.github.com/en/rest/orgs/orgs#get-an-organization
    #[derive(serde::Deserialize, Debug, Clone)]
    pub(crate) struct Organization {
        pub(crate) login: String,
        pub(crate) name: Option<String>,
    }
}

pub(crate) mod repos_api_response {
    use chrono::{DateTime, Utc};

    /// see https://docs.github.com/en/rest/repos/repos#list-organization-repositories
    #[derive(serde::Deserialize, Debug, Clone)]
    pub(crate) struct Repository {
        pub(crate) id: u64,
        pub(crate) name: String,
        pub(crate) full_name: String,
        pub(crate) description: Option<String>,
        pub(crate) private: bool,
        pub(crate) fork: bool,
        #[serde(default)]
        pub(crate) visibility: String,
        pub(crate) updated_at: DateTime<Utc>,
        /// `{base}/repos/{org}/{repo}/collaborators{/collaborator}`
        #[serde(default)]
        pub(crate) collaborators_url: Option<String>,
    }
}

pub(crate) mod collaborators_api_response {
    pub(crate) const ADMIN_ROLE: &str = "admin";

    /// see https://docs.github.com/en/rest/collaborators/collaborators#list-repository-collaborators
    #[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Collaborator {
        pub(crate) login: String,
        pub(crate) role_name: String,
    }

    impl Collaborator {
        pub(crate) fn is_admin(&self) -> bool {
            self.role_name == ADMIN_ROLE
        }
    }
}

pub(crate) mod user_api_response {
    /// see https://docs.github.com/en/rest/users/users#get-a-user
    #[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
    pub(crate) struct UserDetail {
        pub(crate) login: String,
        pub(crate) name: Option<String>,
        pub(crate) email: Option<String>,
    }
}
