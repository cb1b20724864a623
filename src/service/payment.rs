//! Payment orchestration.
//!
//! [`PaymentOrchestrator`] drives the order state machine from the payment
//! side: it creates (or reuses) provider authorizations for pending orders
//! and applies the provider's signed webhook confirmations, finalizing or
//! cancelling the order accordingly.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::{DiscountProvider, PaymentAuthorization, PaymentProvider};
use crate::domain::{OrderId, OrderStatus};
use crate::error::EngineError;
use crate::locking::SeatLockStore;
use crate::persistence::OrderStore;
use crate::service::OrderService;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook payloads against an HMAC-SHA256 signature computed
/// over the raw request body with a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret_configured", &self.secret.is_some())
            .finish()
    }
}

impl WebhookVerifier {
    /// Creates a verifier. `None` means no secret is configured; every
    /// verification then fails as a configuration error rather than
    /// letting unsigned payloads through.
    #[must_use]
    pub const fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Verifies `signature` (lowercase hex) against `body`.
    ///
    /// # Errors
    ///
    /// - Configuration-kind [`EngineError::Webhook`] when no secret is set.
    /// - Validation-kind [`EngineError::Webhook`] for a missing, malformed,
    ///   or mismatching signature.
    pub fn verify(&self, signature: Option<&str>, body: &[u8]) -> Result<(), EngineError> {
        let Some(secret) = &self.secret else {
            return Err(EngineError::webhook_configuration(
                "webhook secret is not configured",
            ));
        };
        let Some(signature) = signature else {
            return Err(EngineError::webhook_validation("signature header missing"));
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| EngineError::webhook_configuration(format!("unusable secret: {e}")))?;
        mac.update(body);

        let provided = hex::decode(signature)
            .map_err(|e| EngineError::webhook_validation(format!("signature is not hex: {e}")))?;
        mac.verify_slice(&provided)
            .map_err(|_| EngineError::webhook_validation("signature mismatch"))
    }
}

/// Payload of a payment confirmation webhook.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    authorization_id: Option<String>,
    order_id: Uuid,
}

/// Creates payment authorizations and applies webhook confirmations.
///
/// Authorization creation is serialized per order: a second request while
/// one is in flight waits and then reuses the authorization the first one
/// created, so an order never ends up with two live holds.
#[derive(Debug)]
pub struct PaymentOrchestrator<L, S, D, P> {
    orders: Arc<OrderService<L, S, D>>,
    provider: Arc<P>,
    verifier: WebhookVerifier,
    currency: String,
    inflight: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<L, S, D, P> PaymentOrchestrator<L, S, D, P>
where
    L: SeatLockStore,
    S: OrderStore,
    D: DiscountProvider,
    P: PaymentProvider,
{
    /// Creates the orchestrator.
    pub fn new(
        orders: Arc<OrderService<L, S, D>>,
        provider: Arc<P>,
        verifier: WebhookVerifier,
        currency: String,
    ) -> Self {
        Self {
            orders,
            provider,
            verifier,
            currency,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a payment authorization for a pending order, or returns
    /// the existing one if it is still live.
    ///
    /// A stored authorization in a terminal remote state (succeeded or
    /// cancelled) is replaced with a fresh one; this covers the buyer
    /// abandoning a confirmation and coming back.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidState`] when the order is not pending.
    /// - [`EngineError::PaymentProvider`] on provider failure.
    pub async fn create_payment(&self, id: OrderId) -> Result<PaymentAuthorization, EngineError> {
        let guard = self.order_guard(id).await;
        let _held = guard.lock().await;

        let result = self.create_payment_locked(id).await;

        drop(_held);
        self.drop_guard_if_idle(id, guard).await;
        result
    }

    async fn create_payment_locked(
        &self,
        id: OrderId,
    ) -> Result<PaymentAuthorization, EngineError> {
        let order = self.orders.get_order(id).await?;
        if order.status != OrderStatus::Pending {
            return Err(EngineError::InvalidState {
                order_id: *id.as_uuid(),
                status: order.status.to_string(),
                operation: "authorize payment for",
            });
        }

        if let Some(existing_id) = &order.payment_authorization_id {
            match self.provider.retrieve_authorization(existing_id).await {
                Ok(existing) if !existing.status.is_terminal() => {
                    debug!(order_id = %id, authorization_id = %existing.id, "reusing live authorization");
                    return Ok(existing);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(order_id = %id, authorization_id = %existing_id, error = %e, "stored authorization unverifiable, creating a new one");
                }
            }
        }

        let authorization = self
            .provider
            .create_authorization(id, order.total, &self.currency)
            .await?;
        self.orders
            .record_payment_authorization(id, &authorization.id)
            .await?;

        info!(order_id = %id, authorization_id = %authorization.id, amount = %order.total, "payment authorization created");
        Ok(authorization)
    }

    /// Verifies and applies a payment webhook.
    ///
    /// `payment.succeeded` finalizes the order; `payment.failed` and
    /// `payment.cancelled` cancel it and void the remote authorization.
    /// Unknown event types are acknowledged without action, and replays
    /// against an order already in the target state are treated as
    /// no-ops so provider retries stay idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Webhook`] in the configuration, validation,
    /// or processing category.
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), EngineError> {
        self.verifier.verify(signature, body)?;

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| EngineError::webhook_validation(format!("malformed payload: {e}")))?;
        let order_id = OrderId::from_uuid(event.order_id);

        match event.kind.as_str() {
            "payment.succeeded" => {
                self.apply_transition(order_id, OrderStatus::Completed)
                    .await
            }
            "payment.failed" | "payment.cancelled" => {
                let applied = self
                    .apply_transition(order_id, OrderStatus::Cancelled)
                    .await;
                if applied.is_ok()
                    && let Some(authorization_id) = &event.authorization_id
                    && let Err(e) = self.provider.cancel_authorization(authorization_id).await
                {
                    warn!(order_id = %order_id, authorization_id, error = %e, "remote authorization void failed");
                }
                applied
            }
            other => {
                debug!(order_id = %order_id, event_type = other, "ignoring unknown webhook event type");
                Ok(())
            }
        }
    }

    async fn apply_transition(&self, id: OrderId, to: OrderStatus) -> Result<(), EngineError> {
        let result = match to {
            OrderStatus::Completed => self.orders.checkout(id).await,
            OrderStatus::Cancelled => self.orders.cancel_order(id).await,
            OrderStatus::Pending => {
                return Err(EngineError::Internal(
                    "webhook cannot transition an order to pending".to_string(),
                ));
            }
        };
        match result {
            Ok(_) => Ok(()),
            // Replayed delivery: the order already reached a terminal
            // state, acknowledge instead of failing the retry loop.
            Err(EngineError::InvalidState { status, .. }) if status == to.to_string() => {
                debug!(order_id = %id, status, "webhook replay, order already transitioned");
                Ok(())
            }
            Err(e) => Err(EngineError::webhook_processing(format!(
                "could not transition order {id} to {to}: {e}"
            ))),
        }
    }

    async fn order_guard(&self, id: OrderId) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        Arc::clone(inflight.entry(*id.as_uuid()).or_default())
    }

    /// Drops the per-order guard once nobody else holds it, so the map
    /// does not grow with every order ever paid.
    async fn drop_guard_if_idle(&self, id: OrderId, guard: Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        drop(guard);
        if let Some(entry) = inflight.get(id.as_uuid())
            && Arc::strong_count(entry) == 1
        {
            inflight.remove(id.as_uuid());
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{CartItem, Discount, EventBus};
    use crate::locking::InMemorySeatLockStore;
    use crate::persistence::InMemoryOrderStore;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct NullDiscounts;

    impl DiscountProvider for NullDiscounts {
        async fn fetch_by_code(&self, _code: &str) -> Result<Option<Discount>, EngineError> {
            Ok(None)
        }
        async fn increment_usage(&self, _id: &str) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        created: AtomicUsize,
        cancelled: AtomicUsize,
    }

    impl PaymentProvider for CountingProvider {
        async fn create_authorization(
            &self,
            order_id: OrderId,
            _amount: Decimal,
            _currency: &str,
        ) -> Result<PaymentAuthorization, EngineError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentAuthorization {
                id: format!("auth-{order_id}-{n}"),
                client_secret: "cs_test".to_string(),
                status: crate::clients::AuthorizationStatus::RequiresConfirmation,
            })
        }

        async fn retrieve_authorization(
            &self,
            authorization_id: &str,
        ) -> Result<PaymentAuthorization, EngineError> {
            Ok(PaymentAuthorization {
                id: authorization_id.to_string(),
                client_secret: "cs_test".to_string(),
                status: crate::clients::AuthorizationStatus::RequiresConfirmation,
            })
        }

        async fn cancel_authorization(&self, _authorization_id: &str) -> Result<(), EngineError> {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    type TestOrchestrator = PaymentOrchestrator<
        InMemorySeatLockStore,
        InMemoryOrderStore,
        NullDiscounts,
        CountingProvider,
    >;

    const SECRET: &str = "whsec_test";

    fn orchestrator() -> (
        Arc<OrderService<InMemorySeatLockStore, InMemoryOrderStore, NullDiscounts>>,
        Arc<CountingProvider>,
        TestOrchestrator,
    ) {
        let orders = Arc::new(OrderService::new(
            Arc::new(InMemorySeatLockStore::new(Duration::from_secs(300))),
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(NullDiscounts),
            EventBus::new(16),
        ));
        let provider = Arc::new(CountingProvider::default());
        let orchestrator = PaymentOrchestrator::new(
            Arc::clone(&orders),
            Arc::clone(&provider),
            WebhookVerifier::new(Some(SECRET.to_string())),
            "usd".to_string(),
        );
        (orders, provider, orchestrator)
    }

    async fn placed_order(
        orders: &OrderService<InMemorySeatLockStore, InMemoryOrderStore, NullDiscounts>,
    ) -> OrderId {
        let order = orders
            .place_order(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "evening".to_string(),
                vec![CartItem {
                    seat_id: "A-1".to_string(),
                    tier_id: "ga".to_string(),
                    price: Decimal::from(50),
                }],
            )
            .await;
        let Ok(order) = order else {
            panic!("placement failed");
        };
        order.id
    }

    fn sign(body: &[u8]) -> String {
        let Ok(mut mac) = HmacSha256::new_from_slice(SECRET.as_bytes()) else {
            panic!("mac init failed");
        };
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn verifier_accepts_a_valid_signature() {
        let verifier = WebhookVerifier::new(Some(SECRET.to_string()));
        let body = b"{\"type\":\"payment.succeeded\"}";
        assert!(verifier.verify(Some(&sign(body)), body).is_ok());
    }

    #[test]
    fn verifier_rejects_tampered_bodies_and_missing_signatures() {
        let verifier = WebhookVerifier::new(Some(SECRET.to_string()));
        let body = b"{\"type\":\"payment.succeeded\"}";
        let signature = sign(body);

        let result = verifier.verify(Some(&signature), b"{\"type\":\"tampered\"}");
        assert!(matches!(
            result,
            Err(EngineError::Webhook {
                kind: crate::error::WebhookErrorKind::Validation,
                ..
            })
        ));

        let result = verifier.verify(None, body);
        assert!(matches!(
            result,
            Err(EngineError::Webhook {
                kind: crate::error::WebhookErrorKind::Validation,
                ..
            })
        ));
    }

    #[test]
    fn verifier_without_secret_is_a_configuration_error() {
        let verifier = WebhookVerifier::new(None);
        let result = verifier.verify(Some("deadbeef"), b"{}");
        assert!(matches!(
            result,
            Err(EngineError::Webhook {
                kind: crate::error::WebhookErrorKind::Configuration,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn second_payment_request_reuses_the_authorization() {
        let (orders, provider, orchestrator) = orchestrator();
        let id = placed_order(&orders).await;

        let first = orchestrator.create_payment(id).await;
        let Ok(first) = first else {
            panic!("first authorization failed");
        };

        let second = orchestrator.create_payment(id).await;
        let Ok(second) = second else {
            panic!("second authorization failed");
        };

        assert_eq!(first.id, second.id);
        assert_eq!(provider.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_payment_requests_create_one_authorization() {
        let (orders, provider, orchestrator) = orchestrator();
        let orchestrator = Arc::new(orchestrator);
        let id = placed_order(&orders).await;

        let a = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.create_payment(id).await })
        };
        let b = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.create_payment(id).await })
        };

        let (a, b) = tokio::join!(a, b);
        let (Ok(Ok(a)), Ok(Ok(b))) = (a, b) else {
            panic!("authorization failed");
        };
        assert_eq!(a.id, b.id);
        assert_eq!(provider.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn payment_for_a_cancelled_order_is_rejected() {
        let (orders, _provider, orchestrator) = orchestrator();
        let id = placed_order(&orders).await;
        let _ = orders.cancel_order(id).await;

        let result = orchestrator.create_payment(id).await;
        assert!(matches!(result, Err(EngineError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn succeeded_webhook_completes_the_order() {
        let (orders, _provider, orchestrator) = orchestrator();
        let id = placed_order(&orders).await;

        let body = serde_json::json!({
            "type": "payment.succeeded",
            "authorization_id": "auth-1",
            "order_id": id,
        });
        let body = serde_json::to_vec(&body).unwrap_or_default();

        let result = orchestrator.handle_webhook(Some(&sign(&body)), &body).await;
        assert!(result.is_ok());

        let order = orders.get_order(id).await;
        let Ok(order) = order else {
            panic!("order vanished");
        };
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn failed_webhook_cancels_and_voids() {
        let (orders, provider, orchestrator) = orchestrator();
        let id = placed_order(&orders).await;

        let body = serde_json::json!({
            "type": "payment.failed",
            "authorization_id": "auth-1",
            "order_id": id,
        });
        let body = serde_json::to_vec(&body).unwrap_or_default();

        let result = orchestrator.handle_webhook(Some(&sign(&body)), &body).await;
        assert!(result.is_ok());

        let order = orders.get_order(id).await;
        let Ok(order) = order else {
            panic!("order vanished");
        };
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn webhook_replay_is_idempotent() {
        let (orders, _provider, orchestrator) = orchestrator();
        let id = placed_order(&orders).await;

        let body = serde_json::json!({
            "type": "payment.succeeded",
            "order_id": id,
        });
        let body = serde_json::to_vec(&body).unwrap_or_default();
        let signature = sign(&body);

        assert!(
            orchestrator
                .handle_webhook(Some(&signature), &body)
                .await
                .is_ok()
        );
        assert!(
            orchestrator
                .handle_webhook(Some(&signature), &body)
                .await
                .is_ok()
        );

        let order = orders.get_order(id).await;
        let Ok(order) = order else {
            panic!("order vanished");
        };
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_event_types_are_acknowledged_without_action() {
        let (orders, _provider, orchestrator) = orchestrator();
        let id = placed_order(&orders).await;

        let body = serde_json::json!({
            "type": "payment.disputed",
            "order_id": id,
        });
        let body = serde_json::to_vec(&body).unwrap_or_default();

        let result = orchestrator.handle_webhook(Some(&sign(&body)), &body).await;
        assert!(result.is_ok());

        let order = orders.get_order(id).await;
        let Ok(order) = order else {
            panic!("order vanished");
        };
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
