//! In-memory hosting and registry fakes for unit tests

use crate::error::{HostingError, HttpError, RegistryError};
use crate::hosting::{
    BranchCreation, FileFetch, FileUpdate, NewPullRequest, PrCreation, PullRequest, RepoId,
    RepositoryHost,
};
use crate::manifest::MANIFEST_FILE;
use crate::registry::VersionResolver;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

fn injected(operation: &str) -> HostingError {
    HostingError::transport(
        operation,
        HttpError::Network {
            url: format!("fake://{}", operation),
            message: "injected failure".to_string(),
        },
    )
}

#[derive(Default)]
struct HostState {
    default_branch: String,
    /// (branch, path) -> (content, sha)
    files: HashMap<(String, String), (String, String)>,
    branches: HashSet<String>,
    open_prs: HashMap<String, PullRequest>,
    created_prs: Vec<NewPullRequest>,
    commits: Vec<FileUpdate>,
    failing: HashSet<String>,
    next_sha: u64,
    next_pr: u64,
}

/// Hosting fake with one repository, branch-scoped files and error injection
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl FakeHost {
    /// Repository every call is expected to target
    pub fn repo() -> RepoId {
        RepoId::new("octo", "app")
    }

    /// Host whose default branch `main` holds no manifest
    pub fn empty() -> Self {
        let mut state = HostState {
            default_branch: "main".to_string(),
            next_pr: 1,
            ..HostState::default()
        };
        state.branches.insert("main".to_string());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Host whose default branch `main` holds the given manifest
    pub fn with_manifest(content: &str) -> Self {
        let host = Self::empty();
        host.set_file("main", MANIFEST_FILE, content);
        host
    }

    /// Replace a file on a branch
    pub fn set_file(&self, branch: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_sha += 1;
        let sha = format!("sha{}", state.next_sha);
        state
            .files
            .insert((branch.to_string(), path.to_string()), (content.to_string(), sha));
    }

    /// Current content of a file on a branch
    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(&(branch.to_string(), path.to_string()))
            .map(|(content, _)| content.clone())
    }

    /// Copy a branch's manifest onto the default branch
    pub fn merge(&self, branch: &str) {
        if let Some(content) = self.file(branch, MANIFEST_FILE) {
            self.set_file("main", MANIFEST_FILE, &content);
        }
    }

    /// Pretend a branch already exists remotely
    pub fn add_branch(&self, branch: &str) {
        self.state.lock().unwrap().branches.insert(branch.to_string());
    }

    /// Pretend a pull request is already open for `head`
    pub fn add_open_pull_request(&self, head: &str, number: u64) {
        self.state.lock().unwrap().open_prs.insert(
            head.to_string(),
            PullRequest {
                number,
                html_url: format!("https://github.com/octo/app/pull/{}", number),
            },
        );
    }

    /// Make the named operation fail with a transport error
    pub fn fail_on(&self, operation: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(operation.to_string());
    }

    /// Pull requests created through this host
    pub fn created_pull_requests(&self) -> Vec<NewPullRequest> {
        self.state.lock().unwrap().created_prs.clone()
    }

    /// File updates committed through this host
    pub fn commits(&self) -> Vec<FileUpdate> {
        self.state.lock().unwrap().commits.clone()
    }

    /// Whether a branch exists
    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains(branch)
    }

    fn check(&self, operation: &str) -> Result<(), HostingError> {
        if self.state.lock().unwrap().failing.contains(operation) {
            Err(injected(operation))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn default_branch(&self, _repo: &RepoId) -> Result<String, HostingError> {
        self.check("default_branch")?;
        Ok(self.state.lock().unwrap().default_branch.clone())
    }

    async fn branch_head(&self, _repo: &RepoId, branch: &str) -> Result<String, HostingError> {
        self.check("branch_head")?;
        Ok(format!("head-of-{}", branch))
    }

    async fn fetch_file(
        &self,
        _repo: &RepoId,
        path: &str,
        git_ref: &str,
    ) -> Result<FileFetch, HostingError> {
        self.check("fetch_file")?;
        let state = self.state.lock().unwrap();
        Ok(
            match state.files.get(&(git_ref.to_string(), path.to_string())) {
                Some((content, sha)) => FileFetch::Found {
                    content: content.clone(),
                    sha: sha.clone(),
                },
                None => FileFetch::NotFound,
            },
        )
    }

    async fn create_branch(
        &self,
        _repo: &RepoId,
        branch: &str,
        _from_sha: &str,
    ) -> Result<BranchCreation, HostingError> {
        self.check("create_branch")?;
        let mut state = self.state.lock().unwrap();
        if state.branches.insert(branch.to_string()) {
            Ok(BranchCreation::Created)
        } else {
            Ok(BranchCreation::AlreadyExists)
        }
    }

    async fn put_file(&self, _repo: &RepoId, update: &FileUpdate) -> Result<String, HostingError> {
        self.check("put_file")?;
        {
            let mut state = self.state.lock().unwrap();
            if !state.branches.contains(&update.branch) {
                return Err(HostingError::unexpected("put_file", "no such branch"));
            }
            state.commits.push(update.clone());
        }
        self.set_file(&update.branch, &update.path, &update.content);
        Ok(format!("commit-{}", self.commits().len()))
    }

    async fn create_pull_request(
        &self,
        _repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<PrCreation, HostingError> {
        self.check("create_pull_request")?;
        let mut state = self.state.lock().unwrap();
        if state.open_prs.contains_key(&pr.head) {
            return Ok(PrCreation::AlreadyExists);
        }
        let number = state.next_pr;
        state.next_pr += 1;
        let created = PullRequest {
            number,
            html_url: format!("https://github.com/octo/app/pull/{}", number),
        };
        state.open_prs.insert(pr.head.clone(), created.clone());
        state.created_prs.push(pr.clone());
        Ok(PrCreation::Created(created))
    }

    async fn find_open_pull_request(
        &self,
        _repo: &RepoId,
        branch: &str,
    ) -> Result<Option<PullRequest>, HostingError> {
        self.check("find_open_pull_request")?;
        Ok(self.state.lock().unwrap().open_prs.get(branch).cloned())
    }
}

/// Registry fake answering from a fixed table
#[derive(Default)]
pub struct FakeResolver {
    versions: HashMap<String, Option<String>>,
    failing: HashSet<String>,
}

impl FakeResolver {
    /// Resolver with `name -> latest` entries
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            versions: entries
                .iter()
                .map(|(n, v)| (n.to_string(), Some(v.to_string())))
                .collect(),
            failing: HashSet::new(),
        }
    }

    /// Make lookups of `name` fail
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

#[async_trait]
impl VersionResolver for FakeResolver {
    fn registry_name(&self) -> &'static str {
        "fake"
    }

    async fn latest_version(&self, package: &str) -> Result<Option<String>, RegistryError> {
        if self.failing.contains(package) {
            return Err(RegistryError::transport(
                package,
                "fake",
                HttpError::Timeout {
                    url: format!("fake://{}", package),
                },
            ));
        }
        Ok(self.versions.get(package).cloned().flatten())
    }
}
