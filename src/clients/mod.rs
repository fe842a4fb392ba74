pub mod github_auth;
pub mod github_client;
pub mod leetcode_client;
pub mod leetcode_session;

pub use github_auth::{GithubAuth, GrantedCredentials, OAuthExchange};
pub use github_client::{GithubClient, RemoteRepository};
pub use leetcode_client::{LeetcodeClient, ProblemCatalogue};
pub use leetcode_session::{LeetcodeSession, SolvedSource};

#[cfg(test)]
pub mod fake;
