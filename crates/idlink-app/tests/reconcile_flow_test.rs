//! Integration tests for the reconciliation engine against a recording directory.
//!
//! Each test scripts the directory's answers, runs one sign-up through
//! `ReconcileService`, and checks the exact sequence of directory calls.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::too_many_lines)]

use idlink_app::{
    AppConfig, Directory, PassThroughReason, Password, ReconcileError, ReconcileService,
    Reconciliation, pass_through_reason,
};
use idlink_core::{DirectoryError, DirectoryUser, LinkOutcome, ProviderUser, UserAttribute};
use idlink_trigger::{SignUpEvent, SignUpRequest, SignUpResponse, TriggerSource};
use serde_json::Map;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const POOL: &str = "eu-central-1_7HLvRT";
const EMAIL: &str = "test@gmail.com";
const SUBJECT: &str = "1147527301736";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    ListUsers { email: String, limit: u32 },
    GetUser { username: String },
    CreateUser { email: String },
    SetPassword { username: String, password: String },
    Link { destination: String, source: String, source_attribute: Option<String> },
    Disable { target: String, identity: String },
}

#[derive(Default)]
struct Script {
    users: Vec<DirectoryUser>,
    lookup_fails: bool,
    full_user: Option<DirectoryUser>,
    created_username: Option<String>,
    create_fails: bool,
    password_fails: bool,
    link_error: Option<fn() -> DirectoryError>,
    disable_fails: bool,
}

#[derive(Clone, Default)]
struct RecordingDirectory {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingDirectory {
    fn with(script: Script) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<Call> {
        guard(&self.calls).clone()
    }

    fn record(&self, call: Call) {
        guard(&self.calls).push(call);
    }

    fn links(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Link { .. }))
            .collect()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transport(operation: &'static str) -> DirectoryError {
    DirectoryError::Transport {
        operation,
        message: "connection reset".into(),
    }
}

fn already_linked() -> DirectoryError {
    DirectoryError::from_service(
        "AdminLinkProviderForUser",
        "InvalidParameterException",
        "Merging is not currently supported, provide a SourceUser with a new subject",
    )
}

fn throttled() -> DirectoryError {
    DirectoryError::Transport {
        operation: "AdminLinkProviderForUser",
        message: "throttled".into(),
    }
}

impl Directory for RecordingDirectory {
    async fn list_users_by_email(
        &self,
        directory_id: &str,
        email: &str,
        limit: u32,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        assert_eq!(directory_id, POOL);
        self.record(Call::ListUsers {
            email: email.to_owned(),
            limit,
        });
        let script = guard(&self.script);
        if script.lookup_fails {
            return Err(transport("ListUsers"));
        }
        Ok(script.users.clone())
    }

    async fn get_user(
        &self,
        _directory_id: &str,
        username: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        self.record(Call::GetUser {
            username: username.to_owned(),
        });
        guard(&self.script)
            .full_user
            .clone()
            .ok_or_else(|| transport("AdminGetUser"))
    }

    async fn create_native_user(
        &self,
        _directory_id: &str,
        email: &str,
    ) -> Result<Option<String>, DirectoryError> {
        self.record(Call::CreateUser {
            email: email.to_owned(),
        });
        let script = guard(&self.script);
        if script.create_fails {
            return Err(transport("AdminCreateUser"));
        }
        Ok(script.created_username.clone())
    }

    async fn set_permanent_password(
        &self,
        _directory_id: &str,
        username: &str,
        password: &Password,
    ) -> Result<(), DirectoryError> {
        self.record(Call::SetPassword {
            username: username.to_owned(),
            password: password.expose().to_owned(),
        });
        if guard(&self.script).password_fails {
            return Err(DirectoryError::from_service(
                "AdminSetUserPassword",
                "InvalidPasswordException",
                "Password does not conform to policy",
            ));
        }
        Ok(())
    }

    async fn link_identities(
        &self,
        _directory_id: &str,
        destination: &ProviderUser,
        source: &ProviderUser,
    ) -> Result<(), DirectoryError> {
        self.record(Call::Link {
            destination: destination.to_string(),
            source: source.to_string(),
            source_attribute: source.attribute_name.clone(),
        });
        guard(&self.script).link_error.map_or(Ok(()), |make| Err(make()))
    }

    async fn disable_linked_identity(
        &self,
        _directory_id: &str,
        target_username: &str,
        identity: &ProviderUser,
    ) -> Result<(), DirectoryError> {
        self.record(Call::Disable {
            target: target_username.to_owned(),
            identity: identity.to_string(),
        });
        if guard(&self.script).disable_fails {
            return Err(transport("AdminDisableProviderForUser"));
        }
        Ok(())
    }
}

fn social_sign_up() -> SignUpEvent {
    SignUpEvent {
        trigger_source: TriggerSource::ExternalProvider,
        region: Some("eu-central-1".into()),
        directory_id: POOL.into(),
        external_username: Some(format!("Google_{SUBJECT}")),
        request: Some(SignUpRequest {
            user_attributes: Some(BTreeMap::from([
                ("email".to_owned(), "Test@Gmail.com".to_owned()),
                ("given_name".to_owned(), "test".to_owned()),
            ])),
            extra: Map::new(),
        }),
        response: Some(SignUpResponse::default()),
        extra: Map::new(),
    }
}

fn user(username: &str, attributes: Vec<UserAttribute>) -> DirectoryUser {
    DirectoryUser {
        username: Some(username.into()),
        attributes,
    }
}

fn identities(entries: &[(&str, &str)]) -> UserAttribute {
    let json = entries
        .iter()
        .map(|(provider, id)| {
            format!(r#"{{"userId":"{id}","providerName":"{provider}","providerType":"{provider}","issuer":null,"primary":true}}"#)
        })
        .collect::<Vec<_>>()
        .join(",");
    UserAttribute::new("identities", format!("[{json}]"))
}

fn service(directory: &RecordingDirectory) -> ReconcileService<RecordingDirectory> {
    ReconcileService::new(directory.clone(), &AppConfig::default())
}

fn google_link(destination: &str) -> Call {
    Call::Link {
        destination: destination.into(),
        source: format!("Google_{SUBJECT}"),
        source_attribute: Some("Cognito_Subject".into()),
    }
}

#[tokio::test]
async fn native_sign_up_is_returned_unchanged() {
    let directory = RecordingDirectory::default();
    let mut event = social_sign_up();
    event.trigger_source = TriggerSource::SignUp;
    event.external_username = Some("c8302f6d-4469-b31e-36ee6239e267".into());

    let result = service(&directory).handle(event.clone()).await.unwrap();

    assert_eq!(result, event);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn unknown_trigger_sources_pass_through() {
    let directory = RecordingDirectory::default();
    let mut event = social_sign_up();
    event.trigger_source = TriggerSource::Other("PreSignUp_Something".into());

    let result = service(&directory).handle(event.clone()).await.unwrap();

    assert_eq!(result, event);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn missing_email_passes_through_without_directory_calls() {
    let directory = RecordingDirectory::default();
    let mut event = social_sign_up();
    if let Some(request) = event.request.as_mut() {
        request.user_attributes = Some(BTreeMap::new());
    }
    let original = event.clone();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::PassThrough(PassThroughReason::MissingEmail)
    );
    assert_eq!(event, original);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn unparseable_username_passes_through_without_directory_calls() {
    let directory = RecordingDirectory::default();
    let mut event = social_sign_up();
    event.external_username = Some("nounderscore".into());
    let original = event.clone();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::PassThrough(PassThroughReason::UnparseableUsername)
    );
    assert_eq!(event, original);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn disabled_provider_passes_through() {
    let directory = RecordingDirectory::default();
    let config = AppConfig::from_toml("[trigger]\ndisabled_providers = [\"google\"]").unwrap();
    let service = ReconcileService::new(directory.clone(), &config);
    let mut event = social_sign_up();
    let original = event.clone();

    let outcome = service.reconcile(&mut event).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::PassThrough(PassThroughReason::ProviderDisabled)
    );
    assert_eq!(event, original);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn disabled_engine_passes_through() {
    let directory = RecordingDirectory::default();
    let config = AppConfig::from_toml("[trigger]\nenabled = false").unwrap();
    let service = ReconcileService::new(directory.clone(), &config);
    let event = social_sign_up();

    let result = service.handle(event.clone()).await.unwrap();

    assert_eq!(result, event);
    assert!(directory.calls().is_empty());
}

#[test]
fn screening_matches_what_reconcile_would_skip() {
    let trigger = AppConfig::default().trigger;
    assert_eq!(pass_through_reason(&trigger, &social_sign_up()), None);

    let mut native = social_sign_up();
    native.trigger_source = TriggerSource::SignUp;
    assert_eq!(
        pass_through_reason(&trigger, &native),
        Some(PassThroughReason::NotExternalProvider)
    );

    let disabled = AppConfig::from_toml("[trigger]\nenabled = false").unwrap().trigger;
    assert_eq!(
        pass_through_reason(&disabled, &social_sign_up()),
        Some(PassThroughReason::Disabled)
    );
}

#[tokio::test]
async fn existing_native_user_gets_linked() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, vec![UserAttribute::new("email", EMAIL)])],
        full_user: Some(user(EMAIL, vec![UserAttribute::new("email", EMAIL)])),
        ..Script::default()
    });
    let mut event = social_sign_up();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Existing {
            destination: EMAIL.into(),
            outcome: LinkOutcome::Linked,
        }
    );
    assert_eq!(
        directory.calls(),
        vec![
            Call::ListUsers {
                email: EMAIL.into(),
                limit: 5,
            },
            Call::GetUser {
                username: EMAIL.into(),
            },
            google_link("Cognito_test@gmail.com"),
        ]
    );
    assert!(event.is_confirmed_and_verified());
}

#[tokio::test]
async fn native_candidate_wins_over_federated_shadow() {
    let directory = RecordingDirectory::with(Script {
        users: vec![
            user("facebook_998", Vec::new()),
            user("a33faa43-4430-46b9-9604-54f42bd12d51", Vec::new()),
        ],
        ..Script::default()
    });

    let outcome = service(&directory).reconcile(&mut social_sign_up()).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Existing {
            destination: "a33faa43-4430-46b9-9604-54f42bd12d51".into(),
            outcome: LinkOutcome::Linked,
        }
    );
    assert_eq!(
        directory.links(),
        vec![google_link("Cognito_a33faa43-4430-46b9-9604-54f42bd12d51")]
    );
}

#[tokio::test]
async fn federated_only_candidate_is_linked_by_provider_identity() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user("facebook_998", Vec::new())],
        ..Script::default()
    });

    service(&directory).reconcile(&mut social_sign_up()).await.unwrap();

    assert_eq!(directory.links(), vec![google_link("Facebook_998")]);
}

#[tokio::test]
async fn exact_existing_identity_issues_no_link() {
    let linked = vec![
        UserAttribute::new("email", EMAIL),
        identities(&[("Google", SUBJECT)]),
    ];
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, linked.clone())],
        full_user: Some(user(EMAIL, linked)),
        ..Script::default()
    });
    let mut event = social_sign_up();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Existing {
            destination: EMAIL.into(),
            outcome: LinkOutcome::Skipped,
        }
    );
    assert!(directory.links().is_empty());
    assert!(event.is_confirmed_and_verified());
}

#[tokio::test]
async fn steady_state_is_a_no_op_on_every_run() {
    let linked = vec![identities(&[("google", SUBJECT), ("Facebook", "998")])];
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, linked.clone())],
        full_user: Some(user(EMAIL, linked)),
        ..Script::default()
    });
    let service = service(&directory);

    let first = service.handle(social_sign_up()).await.unwrap();
    let second = service.handle(first.clone()).await.unwrap();

    assert_eq!(first, second);
    let mutating = directory
        .calls()
        .into_iter()
        .filter(|call| !matches!(call, Call::ListUsers { .. } | Call::GetUser { .. }))
        .count();
    assert_eq!(mutating, 0);
}

#[tokio::test]
async fn stale_identity_is_detached_then_relinked() {
    let linked = vec![identities(&[("Google", "old-subject")])];
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, Vec::new())],
        full_user: Some(user(EMAIL, linked)),
        ..Script::default()
    });

    let outcome = service(&directory).reconcile(&mut social_sign_up()).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Existing {
            destination: EMAIL.into(),
            outcome: LinkOutcome::StaleReplaced,
        }
    );
    let calls = directory.calls();
    assert_eq!(
        &calls[2..],
        &[
            Call::Disable {
                target: EMAIL.into(),
                identity: "Google_old-subject".into(),
            },
            google_link("Cognito_test@gmail.com"),
        ]
    );
}

#[tokio::test]
async fn failed_detach_does_not_stop_relink() {
    let linked = vec![identities(&[("Google", "old-subject")])];
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, Vec::new())],
        full_user: Some(user(EMAIL, linked)),
        disable_fails: true,
        ..Script::default()
    });
    let mut event = social_sign_up();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert!(matches!(
        outcome,
        Reconciliation::Existing {
            outcome: LinkOutcome::StaleReplaced,
            ..
        }
    ));
    assert_eq!(directory.links().len(), 1);
    assert!(event.is_confirmed_and_verified());
}

#[tokio::test]
async fn failed_full_fetch_falls_back_to_lookup_attributes() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, vec![identities(&[("Google", SUBJECT)])])],
        full_user: None,
        ..Script::default()
    });

    let outcome = service(&directory).reconcile(&mut social_sign_up()).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Existing {
            destination: EMAIL.into(),
            outcome: LinkOutcome::Skipped,
        }
    );
    assert!(directory.links().is_empty());
}

#[tokio::test]
async fn malformed_identities_are_treated_as_unlinked() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, Vec::new())],
        full_user: Some(user(EMAIL, vec![UserAttribute::new("identities", "{not json")])),
        ..Script::default()
    });

    let outcome = service(&directory).reconcile(&mut social_sign_up()).await.unwrap();

    assert!(matches!(
        outcome,
        Reconciliation::Existing {
            outcome: LinkOutcome::Linked,
            ..
        }
    ));
    assert_eq!(directory.links(), vec![google_link("Cognito_test@gmail.com")]);
}

#[tokio::test]
async fn already_linked_conflict_is_absorbed() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, Vec::new())],
        link_error: Some(already_linked),
        ..Script::default()
    });
    let mut event = social_sign_up();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert!(matches!(
        outcome,
        Reconciliation::Existing {
            outcome: LinkOutcome::Skipped,
            ..
        }
    ));
    assert!(event.is_confirmed_and_verified());
}

#[tokio::test]
async fn other_link_failures_propagate_and_leave_flags_unset() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, Vec::new())],
        link_error: Some(throttled),
        ..Script::default()
    });
    let mut event = social_sign_up();

    let err = service(&directory).reconcile(&mut event).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Link { .. }));
    assert!(err.to_string().contains("Google_1147527301736"));
    assert!(!event.is_confirmed_and_verified());
}

#[tokio::test]
async fn lookup_failure_is_fatal() {
    let directory = RecordingDirectory::with(Script {
        lookup_fails: true,
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Lookup { .. }));
    assert_eq!(directory.calls().len(), 1);
}

#[tokio::test]
async fn candidate_without_username_fails() {
    let directory = RecordingDirectory::with(Script {
        users: vec![DirectoryUser::default()],
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::CandidateUsernameMissing { .. }));
    assert!(err.to_string().to_lowercase().contains("username not found"));
    assert_eq!(directory.calls().len(), 1);
}

#[tokio::test]
async fn no_candidate_provisions_native_user_then_links() {
    let created = "a33faa43-4430-46b9-9604-54f42bd12d51";
    let directory = RecordingDirectory::with(Script {
        created_username: Some(created.into()),
        ..Script::default()
    });
    let mut event = social_sign_up();

    let outcome = service(&directory).reconcile(&mut event).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Provisioned {
            username: created.into(),
            outcome: LinkOutcome::Linked,
        }
    );
    let calls = directory.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(
        calls[1],
        Call::CreateUser {
            email: EMAIL.into(),
        }
    );
    match &calls[2] {
        Call::SetPassword { username, password } => {
            assert_eq!(username, created);
            assert_eq!(password.len(), 32);
            assert!(password.chars().any(|c| c.is_ascii_digit()));
            assert!(password.chars().any(|c| !c.is_ascii_alphanumeric()));
        }
        other => panic!("expected password assignment, got {other:?}"),
    }
    assert_eq!(calls[3], google_link(&format!("Cognito_{created}")));
    assert!(event.is_confirmed_and_verified());
}

#[tokio::test]
async fn provisioning_without_username_fails_before_password() {
    let directory = RecordingDirectory::with(Script {
        created_username: None,
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::UsernameMissingAfterCreate { .. }));
    assert!(err.to_string().to_lowercase().contains("username not found"));
    assert_eq!(
        directory.calls(),
        vec![
            Call::ListUsers {
                email: EMAIL.into(),
                limit: 5,
            },
            Call::CreateUser {
                email: EMAIL.into(),
            },
        ]
    );
}

#[tokio::test]
async fn password_failure_reports_the_created_user() {
    let directory = RecordingDirectory::with(Script {
        created_username: Some("new-user".into()),
        password_fails: true,
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert_eq!(err.created_username(), Some("new-user"));
    assert!(directory.links().is_empty());
}

#[tokio::test]
async fn link_failure_after_provisioning_reports_the_created_user() {
    let directory = RecordingDirectory::with(Script {
        created_username: Some("new-user".into()),
        link_error: Some(throttled),
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::ProvisionedLink { .. }));
    assert_eq!(err.created_username(), Some("new-user"));
    assert!(err.to_string().contains("new-user"));
    assert_eq!(directory.calls().len(), 4);
}

#[tokio::test]
async fn existing_user_link_failure_names_no_created_user() {
    let directory = RecordingDirectory::with(Script {
        users: vec![user(EMAIL, Vec::new())],
        link_error: Some(throttled),
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert!(err.created_username().is_none());
}

#[tokio::test]
async fn create_failure_is_fatal() {
    let directory = RecordingDirectory::with(Script {
        create_fails: true,
        ..Script::default()
    });

    let err = service(&directory)
        .handle(social_sign_up())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Create { .. }));
    assert_eq!(directory.calls().len(), 2);
}

#[tokio::test]
async fn configured_lookup_limit_is_used() {
    let directory = RecordingDirectory::default();
    let config = AppConfig::from_toml("[directory]\nlookup_limit = 2").unwrap();
    let service = ReconcileService::new(directory.clone(), &config);

    // No candidates and no username from creation: stops right after create.
    let _ = service.handle(social_sign_up()).await;

    assert_eq!(
        directory.calls().first(),
        Some(&Call::ListUsers {
            email: EMAIL.into(),
            limit: 2,
        })
    );
}
