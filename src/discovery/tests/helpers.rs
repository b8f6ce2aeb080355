//! In-memory directory used by the discovery tests

use crate::directory::api::{
    DirectoryError, DirectoryResult, RepositoryDirectory, RepositoryMetadata,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted page of a listing
#[derive(Clone)]
pub enum Page {
    Repos(Vec<RepositoryMetadata>),
    Status(u16),
}

#[derive(Default)]
pub struct FakeDirectory {
    pub orgs: Vec<String>,
    pub pages: HashMap<String, Vec<Page>>,
    pub fail_org_listing: bool,
    pub page_delay: Option<Duration>,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeDirectory {
    pub fn with_org(mut self, org: &str, pages: Vec<Page>) -> Self {
        self.orgs.push(org.to_string());
        self.pages.insert(org.to_string(), pages);
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositoryDirectory for FakeDirectory {
    async fn organizations(&self) -> DirectoryResult<Vec<String>> {
        if self.fail_org_listing {
            return Err(DirectoryError::Http {
                url: "https://ghe.example/api/v3/organizations".to_string(),
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(self.orgs.clone())
    }

    fn repository_pages<'a>(
        &'a self,
        org: &'a str,
    ) -> BoxStream<'a, DirectoryResult<Vec<RepositoryMetadata>>> {
        let pages = self.pages.get(org).cloned().unwrap_or_default();
        let delay = self.page_delay;
        let guard = ActiveGuard::enter(&self.active, &self.peak);

        stream::unfold(
            (pages.into_iter(), guard, false),
            move |(mut pages, guard, failed)| async move {
                if failed {
                    return None;
                }
                let page = pages.next()?;
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let item = match page {
                    Page::Repos(repos) => Ok(repos),
                    Page::Status(status) => Err(DirectoryError::Http {
                        url: format!("https://ghe.example/api/v3/orgs/{}/repos", org),
                        status,
                        message: "server error".to_string(),
                    }),
                };
                let failed = item.is_err();
                Some((item, (pages, guard, failed)))
            },
        )
        .boxed()
    }
}

/// Counts a listing as active until its stream is dropped
struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn repo(org: &str, name: &str, size: u64) -> RepositoryMetadata {
    RepositoryMetadata {
        full_name: format!("{}/{}", org, name),
        clone_url: format!("https://ghe.example/{}/{}", org, name),
        size: Some(size),
        ..Default::default()
    }
}
