use std::sync::Arc;

use tracing::{debug, info};

use crate::model::Serial;
use crate::observer::ViewObserver;
use crate::transport::{ColorEdit, CommandError, DeviceCommand, DeviceTransport};
use crate::view::{ViewState, ViewStore};

/// Sends user commands and mirrors accepted ones into the view store
/// before the next poll confirms them.
pub struct CommandDispatcher<T: DeviceTransport + ?Sized> {
    transport: Arc<T>,
    store: ViewStore,
    observer: Option<Arc<dyn ViewObserver>>,
}

impl<T: DeviceTransport + ?Sized> Clone for CommandDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            store: self.store.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<T: DeviceTransport + ?Sized> CommandDispatcher<T> {
    pub fn new(
        transport: Arc<T>,
        store: ViewStore,
        observer: Option<Arc<dyn ViewObserver>>,
    ) -> Self {
        Self {
            transport,
            store,
            observer,
        }
    }

    pub async fn set_power(&self, serial: Serial, on: bool) -> Result<ViewState, CommandError> {
        self.dispatch(serial, DeviceCommand::power(on)).await
    }

    pub async fn set_color(
        &self,
        serial: Serial,
        edit: ColorEdit,
    ) -> Result<ViewState, CommandError> {
        if edit.is_empty() {
            return Err(CommandError::EmptyColorEdit(serial));
        }
        self.dispatch(serial, DeviceCommand::color(edit.clamped()))
            .await
    }

    /// Flips the power state currently shown for the device.
    pub async fn toggle(&self, serial: Serial) -> Result<ViewState, CommandError> {
        let view = self
            .store
            .get(&serial)
            .ok_or(CommandError::UnknownDevice(serial))?;
        self.set_power(serial, !view.powered_on).await
    }

    async fn dispatch(
        &self,
        serial: Serial,
        command: DeviceCommand,
    ) -> Result<ViewState, CommandError> {
        let known = self
            .store
            .get(&serial)
            .ok_or(CommandError::UnknownDevice(serial))?;

        self.transport.send_command(serial, command).await?;
        info!(%serial, ?command, "Command accepted");

        // a rebuild may have dropped the device while the command was in flight
        let Some(view) = self.store.apply_optimistic(&serial, &command) else {
            debug!(%serial, "Device left the roster before the optimistic update");
            let mut view = known;
            view.apply_command(&command);
            return Ok(view);
        };

        if let Some(observer) = &self.observer {
            observer.view_states_updated(&[serial]).await;
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::model::Roster;
    use crate::reconciler::{ChangeSet, Reconciler, StructuralCheck};
    use crate::test_helper::{RecordingObserver, device, serial};
    use crate::transport::{SimulatedTransport, TransportError};
    use async_trait::async_trait;
    use std::time::Instant;

    /// Accepts every command, but a new roster without any devices is
    /// reconciled while the command is in flight.
    struct EmptiedWhileSending {
        reconciler: Reconciler,
    }

    #[async_trait]
    impl DeviceTransport for EmptiedWhileSending {
        async fn fetch_roster(&self) -> Result<Roster, TransportError> {
            Ok(Roster::default())
        }

        async fn send_command(
            &self,
            _serial: Serial,
            _command: DeviceCommand,
        ) -> Result<(), CommandError> {
            self.reconciler.reconcile(Roster::default());
            Ok(())
        }
    }

    fn setup() -> (
        Arc<SimulatedTransport>,
        Reconciler,
        CommandDispatcher<SimulatedTransport>,
        Arc<RecordingObserver>,
    ) {
        let transport = Arc::new(SimulatedTransport::new());
        let now = Instant::now();
        transport.add_device(device(1, "Lamp", now));
        transport.add_device(device(2, "Strip", now));
        let reconciler = Reconciler::new(ViewStore::new(), StructuralCheck::Positional);
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = CommandDispatcher::new(
            transport.clone(),
            reconciler.store().clone(),
            Some(observer.clone() as Arc<dyn ViewObserver>),
        );
        (transport, reconciler, dispatcher, observer)
    }

    #[tokio::test]
    async fn test_set_power_updates_view_optimistically() {
        let (transport, reconciler, dispatcher, observer) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());
        let before = reconciler.store().get(&serial(1)).unwrap();

        let view = dispatcher.set_power(serial(1), false).await.unwrap();

        assert!(!view.powered_on);
        assert!(view.pending_optimistic);
        assert_eq!(view.display_color, Rgba::BLACK);
        assert_eq!(view.last_applied, before.last_applied);
        assert_eq!(observer.updates(), vec![vec![serial(1)]]);
        assert_eq!(transport.sent(), vec![(serial(1), DeviceCommand::power(false))]);
    }

    #[tokio::test]
    async fn test_failed_command_leaves_view_untouched() {
        let (transport, reconciler, dispatcher, observer) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());
        transport.set_reachable(false);

        let err = dispatcher.set_power(serial(1), false).await.unwrap_err();

        assert!(matches!(
            err,
            CommandError::Transport(TransportError::Unreachable(_))
        ));
        let view = reconciler.store().get(&serial(1)).unwrap();
        assert!(view.powered_on);
        assert!(!view.pending_optimistic);
        assert!(observer.updates().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_device_is_rejected_before_sending() {
        let (transport, reconciler, dispatcher, _) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());

        let err = dispatcher.set_power(serial(7), true).await.unwrap_err();
        assert_eq!(err, CommandError::UnknownDevice(serial(7)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_set_color_merges_partial_edit() {
        let (transport, reconciler, dispatcher, _) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());

        dispatcher
            .set_color(serial(2), ColorEdit::saturation(100.0))
            .await
            .unwrap();
        let view = dispatcher
            .set_color(serial(2), ColorEdit::hue(240.0))
            .await
            .unwrap();

        assert_eq!(view.color.hue, 240.0);
        assert_eq!(view.color.saturation, 100.0);
        assert_eq!(view.display_color, Rgba::opaque(0, 0, 255));
        // the other device is unaffected
        assert!(!reconciler.store().get(&serial(1)).unwrap().pending_optimistic);
    }

    #[tokio::test]
    async fn test_toggle_uses_displayed_state() {
        let (transport, reconciler, dispatcher, _) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());

        assert!(!dispatcher.toggle(serial(1)).await.unwrap().powered_on);
        assert!(dispatcher.toggle(serial(1)).await.unwrap().powered_on);
        assert_eq!(
            transport.sent(),
            vec![
                (serial(1), DeviceCommand::power(false)),
                (serial(1), DeviceCommand::power(true)),
            ]
        );
    }

    #[tokio::test]
    async fn test_optimistic_power_confirmed_by_later_poll() {
        let (transport, reconciler, dispatcher, _) = setup();
        transport.set_confirmation_lag(1);
        reconciler.reconcile(transport.fetch_roster().await.unwrap());

        dispatcher.set_power(serial(1), false).await.unwrap();

        // the transport has not confirmed yet: its snapshot is stale
        let stale = transport.fetch_roster().await.unwrap();
        assert!(stale.get(&serial(1)).unwrap().powered_on);
        assert_eq!(reconciler.reconcile(stale), ChangeSet::Updated(vec![]));
        assert!(!reconciler.store().get(&serial(1)).unwrap().powered_on);

        let confirmed = transport.fetch_roster().await.unwrap();
        assert_eq!(
            reconciler.reconcile(confirmed),
            ChangeSet::Updated(vec![serial(1)])
        );
        let view = reconciler.store().get(&serial(1)).unwrap();
        assert!(!view.powered_on);
        assert!(!view.pending_optimistic);
    }

    #[tokio::test]
    async fn test_command_for_device_dropped_from_roster() {
        let (transport, reconciler, dispatcher, _) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());
        // roster without device 2 rebuilds the store
        reconciler.reconcile(Roster::new(vec![device(1, "Lamp", Instant::now())]));

        let err = dispatcher.set_power(serial(2), false).await.unwrap_err();
        assert_eq!(err, CommandError::UnknownDevice(serial(2)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_color_edit_is_rejected() {
        let (transport, reconciler, dispatcher, observer) = setup();
        reconciler.reconcile(transport.fetch_roster().await.unwrap());

        let err = dispatcher
            .set_color(serial(1), ColorEdit::default())
            .await
            .unwrap_err();

        assert_eq!(err, CommandError::EmptyColorEdit(serial(1)));
        assert!(transport.sent().is_empty());
        assert!(!reconciler.store().get(&serial(1)).unwrap().pending_optimistic);
        assert!(observer.updates().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_command_succeeds_when_device_leaves_in_flight() {
        let reconciler = Reconciler::new(ViewStore::new(), StructuralCheck::Positional);
        reconciler.reconcile(Roster::new(vec![device(1, "Lamp", Instant::now())]));
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = CommandDispatcher::new(
            Arc::new(EmptiedWhileSending {
                reconciler: reconciler.clone(),
            }),
            reconciler.store().clone(),
            Some(observer.clone() as Arc<dyn ViewObserver>),
        );

        let view = dispatcher.set_power(serial(1), false).await.unwrap();

        assert_eq!(view.serial, serial(1));
        assert!(!view.powered_on);
        assert!(view.pending_optimistic);
        assert!(reconciler.store().is_empty());
        assert!(observer.updates().is_empty());
    }
}
