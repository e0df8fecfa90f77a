mod api;
mod cart;
mod checkout;
mod events;
mod inbox;
mod realtime;
mod session;

use std::sync::Arc;

pub use api::*;
pub use cart::*;
pub use checkout::*;
pub use events::*;
pub use inbox::*;
pub use realtime::*;
pub use session::*;

use quickbite_core::Storage;

/// The quickbite client session layer: authenticated session, cart,
/// notification inbox, and the realtime channel that feeds it.
///
/// One `Client` is one isolated session context with an explicit lifecycle.
/// There are no process-wide singletons, so tests and multi-account setups
/// can hold several side by side.
pub struct Client<S, T, A> {
    api: Arc<A>,

    pub session: Arc<SessionStore<S>>,
    pub cart: Arc<CartState<S>>,
    pub inbox: Arc<NotificationInbox>,
    pub realtime: Arc<RealtimeChannel<T>>,

    emitter: EventSender,
}

/// Shared state passed to the components of the client.
pub struct ClientContext<S> {
    pub storage: Arc<S>,
    pub inbox: Arc<NotificationInbox>,
    pub emitter: EventSender,
}

impl<S, T, A> Client<S, T, A>
where
    S: Storage,
    T: PushTransport,
    A: Api,
{
    /// Creates a fresh session context over the given backends, along with
    /// the receiving end of its event stream.
    pub fn create(storage: S, transport: T, api: A) -> (Self, EventReceiver) {
        let (emitter, receiver) = event_channel();

        let context = ClientContext {
            storage: Arc::new(storage),
            inbox: Arc::new(NotificationInbox::new()),
            emitter: emitter.clone(),
        };

        let client = Self {
            api: Arc::new(api),
            session: Arc::new(SessionStore::new(&context)),
            cart: Arc::new(CartState::new(&context)),
            realtime: Arc::new(RealtimeChannel::new(transport, &context)),
            inbox: context.inbox,
            emitter,
        };

        (client, receiver)
    }

    /// Re-establishes session and cart state from durable storage on process
    /// start, reconnecting the realtime channel when a session survives.
    pub fn restore(&self) {
        self.cart.restore();

        if let Some(identity) = self.session.restore() {
            self.api.set_credential(self.session.token());
            self.realtime.connect(&identity.email);
            self.emit_session_change(true);
        }
    }

    /// Authenticates and brings the session online: identity and token are
    /// stored, and the realtime channel connects for this identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let auth = self.api.authenticate(email, password).await?;
        self.establish(auth)
    }

    /// Registers a new account, then brings the session online like [login].
    pub async fn register(&self, profile: NewProfile) -> Result<Identity> {
        let auth = self.api.register(profile).await?;
        self.establish(auth)
    }

    /// Ends the session: the realtime channel is torn down and the identity
    /// is cleared, both before this returns. The inbox belongs to the
    /// identity, so it is emptied as well.
    pub fn logout(&self) {
        self.realtime.disconnect();
        self.session.logout();
        self.api.set_credential(None);
        self.inbox.clear();
        self.emit_session_change(false);
    }

    /// Tears down the session context. The cart and session stay durable for
    /// a later [Client::restore].
    pub fn dispose(&self) {
        self.realtime.disconnect();
    }

    /// Loads the inbox from the remote service, replacing local records.
    pub async fn refresh_inbox(&self) -> Result<()> {
        let records = self.api.list_notifications().await?;
        self.inbox.replace_all(records);

        Ok(())
    }

    /// Marks one notification read remotely, then locally once acknowledged.
    pub async fn mark_notification_read(&self, id: i64) -> Result<()> {
        self.api.mark_notification_read(id).await?;
        self.inbox.mark_read(id);

        Ok(())
    }

    /// Marks everything read remotely, then locally once acknowledged.
    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        self.api.mark_all_notifications_read().await?;
        self.inbox.mark_all_read();

        Ok(())
    }

    /// Creates an order from the cart. See [place_order].
    pub async fn place_order(
        &self,
        address: DeliveryAddress,
        payment_method: PaymentMethod,
    ) -> std::result::Result<OrderData, CheckoutError> {
        checkout::place_order(&*self.api, &*self.cart, address, payment_method).await
    }

    // Read-only pass-throughs consumed by views

    pub async fn restaurants(&self) -> Result<Vec<RestaurantData>> {
        self.api.list_restaurants().await
    }

    pub async fn restaurant(&self, id: i64) -> Result<RestaurantData> {
        self.api.restaurant(id).await
    }

    pub async fn menu_items(&self, restaurant_id: i64) -> Result<Vec<MenuItemData>> {
        self.api.menu_items(restaurant_id).await
    }

    fn establish(&self, auth: AuthData) -> Result<Identity> {
        let identity = auth.identity.clone();

        self.session.login(auth.identity, auth.token.clone());
        self.api.set_credential(Some(auth.token));
        self.realtime.connect(&identity.email);
        self.emit_session_change(true);

        Ok(identity)
    }

    fn emit_session_change(&self, authenticated: bool) {
        let _ = self
            .emitter
            .send(ClientEvent::SessionChanged { authenticated });
    }
}

impl<S> Clone for ClientContext<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            inbox: self.inbox.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
