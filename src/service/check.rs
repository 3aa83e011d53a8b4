use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{ClassificationCounts, UploadFile, UploadKind};
use crate::service::reconciler::{self, FailurePolicy, ReconcileFailure};
use crate::service::state::{AppState, Event, Operation, TransitionError};
use crate::service::uploader::validate_upload;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Busy(_) => AppError::Busy,
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Drives uploads and reconciliation passes against the shared state
pub struct CheckService {
    state: Arc<Mutex<AppState>>,
    backend: BackendClient,
    required_reference_name: String,
    policy: FailurePolicy,
}

impl CheckService {
    pub fn new(backend: BackendClient, config: &AppConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(AppState::default())),
            backend,
            required_reference_name: config.upload.required_reference_name.clone(),
            policy: config.reconcile.failure_policy,
        }
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    /// Validate a picked file, forward it upstream and install the parsed rows.
    /// Returns the number of rows loaded.
    pub async fn upload(&self, kind: UploadKind, file: Option<UploadFile>) -> Result<usize, AppError> {
        // 1. local validation, nothing is sent on failure
        let file = match validate_upload(kind, file, &self.required_reference_name) {
            Ok(file) => file,
            Err(message) => {
                tracing::warn!("Upload of {} rejected: {}", kind, message);
                // a running operation keeps its state; the caller still learns why
                if let Err(e) = self.state.lock().await.apply(Event::Rejected(message.clone())) {
                    tracing::debug!("Rejection not recorded: {}", e);
                }
                return Err(AppError::Validation(message));
            }
        };

        // 2. forward to the parsing backend
        let backend = self.backend.clone();
        self.exclusive(kind.operation(), move |_| async move {
            tracing::info!("Uploading {} file '{}'", kind, file.file_name);
            match kind {
                UploadKind::Invoices => match backend.upload_invoices(file).await {
                    Ok(records) => {
                        let n = records.len();
                        (Event::InvoicesLoaded(records), Ok(n))
                    }
                    Err(source) => failed(AppError::Upload { kind, source }),
                },
                UploadKind::References => match backend.upload_references(file).await {
                    Ok(records) => {
                        let n = records.len();
                        (Event::ReferencesLoaded(records), Ok(n))
                    }
                    Err(source) => failed(AppError::Upload { kind, source }),
                },
            }
        })
        .await
    }

    /// One reconciliation pass over the currently loaded invoices
    pub async fn reconcile(&self) -> Result<ClassificationCounts, AppError> {
        let backend = self.backend.clone();
        let policy = self.policy;

        self.exclusive(Operation::Reconcile, move |state| {
            let invoices = state.invoices().to_vec();
            if state.references().is_empty() {
                tracing::warn!("No reference file uploaded in this session; lookups may fail");
            }

            async move {
                match reconciler::reconcile(&backend, &invoices, policy).await {
                    Ok(outcome) => {
                        let counts = outcome.counts;
                        (Event::Reconciled(outcome), Ok(counts))
                    }
                    Err(ReconcileFailure { error, partial }) => {
                        let error = AppError::Lookup(error);
                        let event = Event::Failed {
                            message: error.to_string(),
                            partial,
                        };
                        (event, Err(error))
                    }
                }
            }
        })
        .await
    }

    /// Run `body` as the single in-flight operation. The operation runs in its
    /// own task so the state always returns to idle, even when the caller goes away.
    async fn exclusive<T, F, Fut>(&self, operation: Operation, body: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&AppState) -> Fut,
        Fut: Future<Output = (Event, Result<T, AppError>)> + Send + 'static,
    {
        let work = {
            let mut state = self.state.lock().await;
            if let Err(e) = state.apply(Event::Started(operation)) {
                tracing::warn!("Refusing {}: {}", operation, e);
                return Err(e.into());
            }
            body(&*state)
        };
        tracing::info!("{} started", operation);

        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let (event, result) = work.await;
            if let Err(e) = &result {
                tracing::warn!("{} failed: {}", operation, e);
            }
            if let Err(e) = state.lock().await.apply(event) {
                tracing::error!("Could not finish {}: {}", operation, e);
            }
            result
        });

        match task.await {
            Ok(result) => {
                if result.is_ok() {
                    tracing::info!("{} finished", operation);
                }
                result
            }
            Err(join_error) => {
                let message = format!("{} aborted: {}", operation, join_error);
                tracing::error!("{}", message);
                let mut state = self.state.lock().await;
                if state.is_busy() {
                    if let Err(e) = state.apply(Event::Failed {
                        message: message.clone(),
                        partial: None,
                    }) {
                        tracing::error!("Could not reset state: {}", e);
                    }
                }
                Err(AppError::Internal(message))
            }
        }
    }
}

fn failed<T>(error: AppError) -> (Event, Result<T, AppError>) {
    let event = Event::Failed {
        message: error.to_string(),
        partial: None,
    };
    (event, Err(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::state::Phase;
    use crate::service::uploader::NO_FILE_CHOSEN;

    fn service() -> CheckService {
        let config = AppConfig::default();
        CheckService::new(BackendClient::new(&config.backend).unwrap(), &config)
    }

    #[tokio::test]
    async fn invalid_upload_while_idle_records_error() {
        let service = service();

        let result = service
            .upload(UploadKind::References, Some(UploadFile::new("percentages.csv", "x")))
            .await;

        assert!(matches!(result, Err(AppError::Validation(ref m)) if m.contains("Film percentages")));
        let state = service.snapshot().await;
        assert!(state.error().unwrap().contains("Film percentages"));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn invalid_upload_while_busy_reports_validation() {
        let service = service();
        service
            .state
            .lock()
            .await
            .apply(Event::Started(Operation::Reconcile))
            .unwrap();

        let wrong_name = service
            .upload(UploadKind::References, Some(UploadFile::new("percentages.csv", "x")))
            .await;
        let missing = service.upload(UploadKind::Invoices, None).await;

        assert!(matches!(wrong_name, Err(AppError::Validation(ref m)) if m.contains("Film percentages")));
        assert!(matches!(missing, Err(AppError::Validation(ref m)) if m == NO_FILE_CHOSEN));
        let state = service.snapshot().await;
        assert_eq!(state.phase(), Phase::Busy(Operation::Reconcile));
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn valid_upload_while_busy_is_refused() {
        let service = service();
        service
            .state
            .lock()
            .await
            .apply(Event::Started(Operation::Reconcile))
            .unwrap();

        let result = service
            .upload(UploadKind::Invoices, Some(UploadFile::new("facturen.xlsx", "x")))
            .await;

        assert!(matches!(result, Err(AppError::Busy)));
        assert_eq!(service.snapshot().await.phase(), Phase::Busy(Operation::Reconcile));
    }
}
