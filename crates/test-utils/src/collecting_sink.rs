use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use readygate::engine::{CascadeReport, CascadeSink};
use readygate::errors::Result;

/// A sink that records every cascade report it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    reports: Arc<Mutex<Vec<CascadeReport>>>,
}

impl CollectingSink {
    pub fn new(reports: Arc<Mutex<Vec<CascadeReport>>>) -> Self {
        Self { reports }
    }
}

impl CascadeSink for CollectingSink {
    fn deliver(
        &mut self,
        report: CascadeReport,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let reports = Arc::clone(&self.reports);

        Box::pin(async move {
            {
                let mut guard = reports.lock().unwrap();
                guard.push(report);
            }
            Ok(())
        })
    }
}
