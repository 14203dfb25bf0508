//! SubscriptionLifecycleManager - tenant plan subscriptions.
//!
//! The gateway owns billing; this service mirrors its view of each
//! subscription from webhooks and layers the deferred plan changes and
//! cancellations tenants request on top. Every persisted change appends an
//! audit entry with before/after snapshots.

use std::sync::Arc;

use super::commands::{
    CreateSubscriptionCommand, CreatedSubscriptionView, PlanChangeOutcome, ReconcileReport,
    SubscriptionEventOutcome, SubscriptionView,
};
use crate::application::monitoring::BillingMonitor;
use crate::application::BillingError;
use crate::domain::foundation::{Currency, ErrorCode, Money, TenantId, Timestamp};
use crate::domain::ledger::{
    AuditAction, BillingAuditLogEntry, PaymentTransaction, TransactionKind, TransactionOutcome,
    SYSTEM_ACTOR, WEBHOOK_ACTOR,
};
use crate::domain::plan::PlanTier;
use crate::domain::subscription::{CancellationOutcome, Subscription};
use crate::domain::webhook::{GatewayEventKind, WebhookEnvelope};
use crate::ports::{
    BillingAuditLog, CreateSubscriptionRequest, GatewaySubscription, PaymentGateway, PaymentTransactionLog,
    PlanCatalog, SubscriptionRepository,
};

#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    pub return_url: String,
    pub cancel_url: String,
    pub brand_name: Option<String>,
}

pub struct SubscriptionLifecycleManager {
    subscriptions: Arc<dyn SubscriptionRepository>,
    audit: Arc<dyn BillingAuditLog>,
    transactions: Arc<dyn PaymentTransactionLog>,
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<dyn PlanCatalog>,
    monitor: Arc<BillingMonitor>,
    settings: SubscriptionSettings,
}

impl SubscriptionLifecycleManager {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        audit: Arc<dyn BillingAuditLog>,
        transactions: Arc<dyn PaymentTransactionLog>,
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<dyn PlanCatalog>,
        monitor: Arc<BillingMonitor>,
        settings: SubscriptionSettings,
    ) -> Self {
        Self {
            subscriptions,
            audit,
            transactions,
            gateway,
            catalog,
            monitor,
            settings,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tenant Requests
    // ════════════════════════════════════════════════════════════════════════════

    /// Open a subscription at the gateway. The tenant must approve it at the
    /// returned URL before it becomes ACTIVE.
    #[tracing::instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id, tier = %cmd.tier))]
    pub async fn create_subscription(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreatedSubscriptionView, BillingError> {
        if let Some(existing) = self.subscriptions.find_current_for_tenant(&cmd.tenant_id).await? {
            return Err(BillingError::invalid_state(existing.status.as_str(), "create subscription"));
        }

        match self.open_subscription(&cmd).await {
            Ok(created) => {
                self.monitor.metrics().subscription_created();
                Ok(created)
            }
            Err(e) => {
                self.monitor.metrics().subscription_failed();
                self.monitor
                    .subscription_creation_failed(&cmd.tenant_id.to_string(), cmd.tier.as_str(), &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    async fn open_subscription(&self, cmd: &CreateSubscriptionCommand) -> Result<CreatedSubscriptionView, BillingError> {
        let plan_id = self.catalog.provider_plan_id(cmd.tier, cmd.cycle).ok_or_else(|| {
            BillingError::Configuration(format!(
                "No gateway plan configured for {} {}",
                cmd.tier,
                cmd.cycle.as_str()
            ))
        })?;

        let now = Timestamp::now();
        let created = self
            .gateway
            .create_subscription(
                &cmd.tenant_id,
                CreateSubscriptionRequest {
                    plan_id: plan_id.clone(),
                    custom_id: cmd.tenant_id.to_string(),
                    return_url: self.settings.return_url.clone(),
                    cancel_url: self.settings.cancel_url.clone(),
                    brand_name: self.settings.brand_name.clone(),
                    idempotency_key: format!(
                        "subscription:{}:{}:{}",
                        cmd.tenant_id,
                        plan_id,
                        now.as_datetime().format("%Y-%m-%d")
                    ),
                },
            )
            .await?;

        let subscription =
            Subscription::create_pending(cmd.tenant_id, created.subscription_id.clone(), cmd.tier, cmd.cycle, now)?;
        self.subscriptions.insert(&subscription).await?;
        self.append_audit(&subscription, SYSTEM_ACTOR, AuditAction::SubscriptionCreated, None, now)
            .await;

        tracing::info!(subscription_id = %created.subscription_id, plan_id = %plan_id, "Subscription created");
        Ok(CreatedSubscriptionView {
            subscription_id: created.subscription_id,
            status: subscription.status,
            approval_url: created.approval_url,
        })
    }

    /// Change tier now, or at the end of the current billing period.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn request_plan_change(
        &self,
        tenant_id: &TenantId,
        tier: PlanTier,
        immediate: bool,
    ) -> Result<PlanChangeOutcome, BillingError> {
        let mut subscription = self.current(tenant_id).await?;
        if self.catalog.tier_details(tier).is_none() {
            return Err(BillingError::Configuration(format!("Plan tier {} is not in the catalog", tier)));
        }
        if subscription.plan_tier == tier && subscription.pending_plan_change.is_none() {
            return Err(BillingError::validation("tier", format!("Subscription is already on {}", tier)));
        }

        let before = subscription.snapshot();
        let now = Timestamp::now();
        let (outcome, action) = if immediate {
            subscription.change_plan_now(tier, now)?;
            (PlanChangeOutcome::Applied(tier), AuditAction::PlanChanged)
        } else {
            let effective_date = subscription.schedule_plan_change(tier, now)?;
            (
                PlanChangeOutcome::Scheduled { tier, effective_date },
                AuditAction::PlanChangeScheduled,
            )
        };

        self.subscriptions.update(&subscription).await?;
        self.append_audit(&subscription, &tenant_id.to_string(), action, Some(before), now)
            .await;
        tracing::info!(?outcome, "Plan change recorded");
        Ok(outcome)
    }

    /// Schedule a cancellation; defaults to the end of the current period.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn request_cancellation(
        &self,
        tenant_id: &TenantId,
        effective_date: Option<Timestamp>,
    ) -> Result<CancellationOutcome, BillingError> {
        let mut subscription = self.current(tenant_id).await?;
        let before = subscription.snapshot();
        let now = Timestamp::now();

        let outcome = subscription.schedule_cancellation(effective_date, now)?;
        self.subscriptions.update(&subscription).await?;

        let action = match outcome {
            CancellationOutcome::Immediate => {
                self.monitor.metrics().subscription_cancelled();
                AuditAction::SubscriptionCanceled
            }
            CancellationOutcome::Scheduled(_) => AuditAction::CancellationScheduled,
        };
        self.append_audit(&subscription, &tenant_id.to_string(), action, Some(before), now)
            .await;
        tracing::info!(?outcome, "Cancellation recorded");
        Ok(outcome)
    }

    pub async fn subscription_for_tenant(&self, tenant_id: &TenantId) -> Result<Option<SubscriptionView>, BillingError> {
        let Some(subscription) = self.subscriptions.find_current_for_tenant(tenant_id).await? else {
            return Ok(None);
        };
        let features = self.catalog.features(subscription.plan_tier);
        let limits = self.catalog.limits(subscription.plan_tier);
        Ok(Some(SubscriptionView::new(&subscription, features, limits)))
    }

    pub fn resolve_tier_by_provider_plan_id(&self, plan_id: &str) -> Option<PlanTier> {
        self.catalog.resolve_tier_by_provider_plan_id(plan_id).map(|(tier, _)| tier)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Gateway Events
    // ════════════════════════════════════════════════════════════════════════════

    /// Apply a subscription webhook. Transitions the state machine rejects
    /// are logged and ignored; persistence conflicts are returned so the
    /// webhook worker retries against fresh state.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn apply_webhook_event(&self, event: &WebhookEnvelope) -> Result<SubscriptionEventOutcome, BillingError> {
        let kind = event.kind();
        if !kind.is_subscription_event() {
            tracing::debug!("Not a subscription event");
            return Ok(SubscriptionEventOutcome::Ignored(format!("unhandled event type {}", event.event_type)));
        }
        let Some(provider_id) = event.subscription_id() else {
            tracing::warn!("Subscription event without a subscription id");
            return Ok(SubscriptionEventOutcome::Ignored("missing subscription id".to_string()));
        };
        let Some(mut subscription) = self.subscriptions.find_by_provider_id(&provider_id).await? else {
            tracing::warn!(subscription_id = %provider_id, "Event for unknown subscription");
            return Ok(SubscriptionEventOutcome::Ignored(format!("unknown subscription {}", provider_id)));
        };

        let now = Timestamp::now();
        let occurred_at = event.occurred_at().unwrap_or(now);
        let before = subscription.snapshot();

        // Events that move the billing period take the period end and the
        // payment method from the gateway's current view when it answers.
        let gateway_view = match kind {
            GatewayEventKind::SubscriptionActivated | GatewayEventKind::SubscriptionRenewalPaid => {
                self.gateway_view(&subscription).await
            }
            _ => None,
        };
        let next_billing = gateway_view
            .as_ref()
            .and_then(|view| view.next_billing_time)
            .or_else(|| event.next_billing_time());

        let applied = match &kind {
            GatewayEventKind::SubscriptionActivated => subscription
                .activate(occurred_at, next_billing)
                .map(|_| vec![AuditAction::SubscriptionActivated]),
            GatewayEventKind::SubscriptionPaymentFailed => subscription
                .mark_past_due(occurred_at)
                .map(|_| vec![AuditAction::SubscriptionPastDue]),
            GatewayEventKind::SubscriptionSuspended => subscription
                .suspend(occurred_at)
                .map(|_| vec![AuditAction::SubscriptionSuspended]),
            GatewayEventKind::SubscriptionCancelled => {
                if let Some(cancellation) = subscription.cancellation.filter(|_| subscription.cancellation_pending(now)) {
                    tracing::info!(
                        subscription_id = %provider_id,
                        until = %cancellation.effective_date,
                        "Gateway cancelled; access continues until scheduled date"
                    );
                    return Ok(SubscriptionEventOutcome::CancellationDeferred {
                        subscription_id: provider_id,
                        until: cancellation.effective_date,
                    });
                }
                subscription.cancel(occurred_at).map(|_| vec![AuditAction::SubscriptionCanceled])
            }
            GatewayEventKind::SubscriptionUpdated => self.apply_plan_update(&mut subscription, event, now),
            GatewayEventKind::SubscriptionRenewalPaid => {
                subscription.record_renewal_payment(occurred_at, next_billing).map(|_| {
                    let mut actions = vec![AuditAction::SubscriptionRenewed];
                    if subscription.promote_due_plan_change(now).is_some() {
                        actions.push(AuditAction::PlanChanged);
                    }
                    actions
                })
            }
            _ => return Ok(SubscriptionEventOutcome::Ignored(format!("unhandled event type {}", event.event_type))),
        };

        let actions = match applied {
            Ok(actions) => actions,
            Err(e) if e.code == ErrorCode::InvalidStateTransition => {
                tracing::warn!(subscription_id = %provider_id, error = %e, "Ignoring out-of-order subscription event");
                if kind == GatewayEventKind::SubscriptionPaymentFailed {
                    self.record_payment(&subscription, event, TransactionOutcome::Failed).await;
                }
                return Ok(SubscriptionEventOutcome::Ignored(e.message));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(method) = gateway_view.and_then(|view| view.payment_method) {
            subscription.record_payment_method(method, now);
        }

        if actions.is_empty() {
            return Ok(SubscriptionEventOutcome::Ignored("no change".to_string()));
        }

        self.subscriptions.update(&subscription).await?;

        match kind {
            GatewayEventKind::SubscriptionActivated => self.monitor.metrics().subscription_activated(),
            GatewayEventKind::SubscriptionSuspended => self.monitor.metrics().subscription_suspended(),
            GatewayEventKind::SubscriptionCancelled => self.monitor.metrics().subscription_cancelled(),
            GatewayEventKind::SubscriptionRenewalPaid => {
                self.record_payment(&subscription, event, TransactionOutcome::Succeeded).await
            }
            GatewayEventKind::SubscriptionPaymentFailed => {
                self.record_payment(&subscription, event, TransactionOutcome::Failed).await
            }
            _ => {}
        }
        for action in actions {
            self.append_audit(&subscription, WEBHOOK_ACTOR, action, Some(before.clone()), now)
                .await;
        }

        tracing::info!(subscription_id = %provider_id, status = %subscription.status, "Subscription event applied");
        Ok(SubscriptionEventOutcome::Applied {
            subscription_id: provider_id,
            status: subscription.status,
        })
    }

    async fn gateway_view(&self, subscription: &Subscription) -> Option<GatewaySubscription> {
        match self
            .gateway
            .fetch_subscription(&subscription.tenant_id, &subscription.provider_subscription_id)
            .await
        {
            Ok(view) => Some(view),
            Err(e) => {
                tracing::warn!(
                    subscription_id = %subscription.provider_subscription_id,
                    error = %e,
                    "Gateway subscription lookup failed, using event data"
                );
                None
            }
        }
    }

    /// Follows a plan revision made at the gateway. An unmapped plan id is a
    /// catalog gap an operator has to fix.
    fn apply_plan_update(
        &self,
        subscription: &mut Subscription,
        event: &WebhookEnvelope,
        now: Timestamp,
    ) -> Result<Vec<AuditAction>, crate::domain::foundation::DomainError> {
        let Some(plan_id) = event.plan_id() else {
            return Ok(Vec::new());
        };
        let Some((tier, cycle)) = self.catalog.resolve_tier_by_provider_plan_id(&plan_id) else {
            return Err(crate::domain::foundation::DomainError::new(
                ErrorCode::ConfigurationError,
                format!("Gateway plan {} is not in the catalog", plan_id),
            ));
        };
        if tier == subscription.plan_tier && cycle == subscription.billing_cycle {
            return Ok(Vec::new());
        }
        subscription.change_plan_now(tier, now)?;
        subscription.billing_cycle = cycle;
        Ok(vec![AuditAction::SubscriptionUpdated])
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ════════════════════════════════════════════════════════════════════════════

    /// Promote plan changes and apply cancellations whose dates have passed.
    pub async fn reconcile_due(&self, now: Timestamp) -> Result<ReconcileReport, BillingError> {
        let mut report = ReconcileReport::default();

        for mut subscription in self.subscriptions.find_due_plan_changes(now).await? {
            let before = subscription.snapshot();
            let Some(tier) = subscription.promote_due_plan_change(now) else {
                continue;
            };
            match self.subscriptions.update(&subscription).await {
                Ok(()) => {
                    report.plan_changes_promoted += 1;
                    self.append_audit(&subscription, SYSTEM_ACTOR, AuditAction::PlanChanged, Some(before), now)
                        .await;
                    tracing::info!(subscription_id = %subscription.provider_subscription_id, tier = %tier, "Plan change promoted");
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(subscription_id = %subscription.provider_subscription_id, error = %e, "Plan change promotion failed");
                }
            }
        }

        for mut subscription in self.subscriptions.find_due_cancellations(now).await? {
            let before = subscription.snapshot();
            match subscription.apply_due_cancellation(now) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(subscription_id = %subscription.provider_subscription_id, error = %e, "Cancellation not applicable");
                    continue;
                }
            }
            match self.subscriptions.update(&subscription).await {
                Ok(()) => {
                    report.cancellations_applied += 1;
                    self.monitor.metrics().subscription_cancelled();
                    self.append_audit(&subscription, SYSTEM_ACTOR, AuditAction::SubscriptionCanceled, Some(before), now)
                        .await;
                    tracing::info!(subscription_id = %subscription.provider_subscription_id, "Scheduled cancellation applied");
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(subscription_id = %subscription.provider_subscription_id, error = %e, "Scheduled cancellation failed");
                }
            }
        }

        if report != ReconcileReport::default() {
            tracing::info!(
                promoted = report.plan_changes_promoted,
                canceled = report.cancellations_applied,
                failures = report.failures,
                "Subscription reconciliation finished"
            );
        }
        Ok(report)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn current(&self, tenant_id: &TenantId) -> Result<Subscription, BillingError> {
        self.subscriptions
            .find_current_for_tenant(tenant_id)
            .await?
            .ok_or_else(|| BillingError::not_found("subscription", tenant_id))
    }

    /// Audit writes never fail the change they describe.
    async fn append_audit(
        &self,
        subscription: &Subscription,
        actor: &str,
        action: AuditAction,
        before: Option<serde_json::Value>,
        now: Timestamp,
    ) {
        let entry = BillingAuditLogEntry::record(
            subscription.tenant_id,
            Some(subscription.id),
            actor,
            action,
            before,
            Some(subscription.snapshot()),
            now,
        );
        if let Err(e) = self.audit.append(&entry).await {
            tracing::error!(action = action.as_str(), error = %e, "Failed to append billing audit entry");
        }
    }

    async fn record_payment(&self, subscription: &Subscription, event: &WebhookEnvelope, outcome: TransactionOutcome) {
        let mut transaction = PaymentTransaction::new(
            subscription.tenant_id,
            TransactionKind::SubscriptionPayment,
            outcome,
            subscription.provider_subscription_id.clone(),
            event.occurred_at().unwrap_or_else(Timestamp::now),
        )
        .with_raw_payload(event.resource.clone());
        if outcome == TransactionOutcome::Succeeded {
            transaction = transaction.with_external_id(event.resource_id());
        }
        let amount = event.amount().and_then(|(value, currency)| {
            Currency::new(&currency)
                .ok()
                .and_then(|currency| Money::from_decimal_str(&value, currency).ok())
        });
        if let Some(amount) = amount {
            transaction = transaction.with_amount(amount);
        }
        if let Err(e) = self.transactions.record(&transaction).await {
            tracing::warn!(subscription_id = %subscription.provider_subscription_id, error = %e, "Failed to record subscription payment");
        }
    }
}
