use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::warn;

static CELL_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_cell_lock_poison_once(cell: &'static str, operation: &'static str) {
    if CELL_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(cell, operation, "state cell lock poisoned; recovered inner value");
    }
}

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ObserverList<T> {
    next_id: u64,
    entries: Vec<(u64, Observer<T>)>,
}

struct CellShared<T> {
    name: &'static str,
    value: RwLock<Arc<T>>,
    revision: AtomicU64,
    observers: Mutex<ObserverList<T>>,
    delivered: Mutex<u64>,
}

impl<T> CellShared<T> {
    fn read_value(&self) -> RwLockReadGuard<'_, Arc<T>> {
        match self.value.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_cell_lock_poison_once(self.name, "read");
                poisoned.into_inner()
            }
        }
    }

    fn write_value(&self) -> RwLockWriteGuard<'_, Arc<T>> {
        match self.value.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_cell_lock_poison_once(self.name, "write");
                poisoned.into_inner()
            }
        }
    }

    fn lock_observers(&self) -> MutexGuard<'_, ObserverList<T>> {
        match self.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_cell_lock_poison_once(self.name, "observers");
                poisoned.into_inner()
            }
        }
    }

    fn lock_delivered(&self) -> MutexGuard<'_, u64> {
        match self.delivered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_cell_lock_poison_once(self.name, "deliver");
                poisoned.into_inner()
            }
        }
    }

    fn remove_observer(&self, id: u64) {
        self.lock_observers()
            .entries
            .retain(|(observer_id, _)| *observer_id != id);
    }
}

/// Shared mutable cell with wholesale replacement and change notification.
///
/// Readers take an `Arc` snapshot, so a replacement is never observed half
/// applied. Observers run on the writing thread after the value lock has been
/// released, in registration order. Deliveries for one cell never overlap, and
/// a write already superseded by a newer delivery is not delivered at all, so
/// the last value an observer sees is the value the cell holds.
///
/// An observer must not write to the cell it observes.
pub struct ObservableCell<T> {
    shared: Arc<CellShared<T>>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCell")
            .field("name", &self.shared.name)
            .field("revision", &self.shared.revision.load(Ordering::Acquire))
            .field("value", &*self.shared.read_value())
            .finish()
    }
}

impl<T: Send + Sync + 'static> ObservableCell<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            shared: Arc::new(CellShared {
                name,
                value: RwLock::new(Arc::new(value)),
                revision: AtomicU64::new(0),
                observers: Mutex::new(ObserverList {
                    next_id: 0,
                    entries: Vec::new(),
                }),
                delivered: Mutex::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.shared.read_value())
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        T::clone(&self.shared.read_value())
    }

    /// Number of writes applied since construction.
    pub fn revision(&self) -> u64 {
        self.shared.revision.load(Ordering::Acquire)
    }

    pub fn set(&self, value: T) -> Arc<T> {
        let next = Arc::new(value);
        let revision = {
            let mut guard = self.shared.write_value();
            *guard = Arc::clone(&next);
            self.shared.revision.fetch_add(1, Ordering::AcqRel) + 1
        };
        self.notify(revision, &next);
        next
    }

    /// Read-modify-write under the value lock.
    pub fn update<F>(&self, apply: F) -> Arc<T>
    where
        F: FnOnce(&T) -> T,
    {
        let (revision, next) = {
            let mut guard = self.shared.write_value();
            let next = Arc::new(apply(&guard));
            *guard = Arc::clone(&next);
            let revision = self.shared.revision.fetch_add(1, Ordering::AcqRel) + 1;
            (revision, next)
        };
        self.notify(revision, &next);
        next
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut list = self.shared.lock_observers();
            let id = list.next_id;
            list.next_id = list.next_id.wrapping_add(1);
            list.entries.push((id, Arc::new(observer)));
            id
        };
        let weak: Weak<CellShared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.remove_observer(id);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        self.shared.lock_observers().entries.len()
    }

    fn notify(&self, revision: u64, value: &T) {
        let mut delivered = self.shared.lock_delivered();
        if revision <= *delivered {
            return;
        }
        *delivered = revision;
        let observers = self
            .shared
            .lock_observers()
            .entries
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect::<Vec<_>>();
        for observer in observers {
            observer(value);
        }
    }
}

/// Observer registration handle. Dropping it unsubscribes.
#[must_use = "dropping a Subscription removes the observer immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keeps the observer registered for as long as the cell lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;

    fn poison_value_lock(cell: &ObservableCell<Vec<u32>>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = cell.shared.value.write().expect("write guard");
                    panic!("poison cell lock");
                })
                .join();
        });
    }

    #[test]
    fn set_replaces_value_and_bumps_revision() {
        let cell = ObservableCell::new("numbers", vec![1, 2, 3]);
        let before = cell.snapshot();

        cell.set(vec![9]);

        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(cell.get(), vec![9]);
        assert_eq!(cell.revision(), 1);
    }

    #[test]
    fn observers_receive_each_write_in_order() {
        let cell = ObservableCell::new("index", 0usize);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = cell.subscribe(move |value| sink.lock().expect("sink").push(*value));

        cell.set(2);
        cell.update(|value| value + 1);

        assert_eq!(*seen.lock().expect("seen"), vec![2, 3]);
    }

    #[test]
    fn racing_writers_leave_observers_on_the_stored_value() {
        let cell = ObservableCell::new("game_index", 0usize);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let _subscription = {
            let seen = Arc::clone(&seen);
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            cell.subscribe(move |value| {
                if *value == 1 {
                    entered.wait();
                    release.wait();
                }
                seen.lock().expect("seen").push(*value);
            })
        };

        let first = {
            let cell = cell.clone();
            thread::spawn(move || {
                cell.set(1);
            })
        };
        entered.wait();
        let second = {
            let cell = cell.clone();
            thread::spawn(move || {
                cell.set(2);
            })
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while cell.get() != 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(cell.get(), 2);
        thread::sleep(Duration::from_millis(20));
        assert!(seen.lock().expect("seen").is_empty());

        release.wait();
        first.join().expect("first writer");
        second.join().expect("second writer");

        assert_eq!(*seen.lock().expect("seen"), vec![1, 2]);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn superseded_write_is_not_delivered() {
        let cell = ObservableCell::new("index", 0usize);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = cell.subscribe(move |value| sink.lock().expect("sink").push(*value));

        cell.set(5);
        cell.notify(1, &3);

        assert_eq!(*seen.lock().expect("seen"), vec![5]);
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn dropping_subscription_stops_notifications() {
        let cell = ObservableCell::new("flag", false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = cell.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        cell.set(true);
        drop(subscription);
        cell.set(false);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn unsubscribe_only_removes_its_own_observer() {
        let cell = ObservableCell::new("flag", false);
        let first = cell.subscribe(|_| {});
        let second = cell.subscribe(|_| {});
        assert_eq!(cell.observer_count(), 2);

        first.unsubscribe();
        assert_eq!(cell.observer_count(), 1);

        second.detach();
        assert_eq!(cell.observer_count(), 1);
    }

    #[test]
    fn subscription_outliving_cell_drops_cleanly() {
        let cell = ObservableCell::new("flag", false);
        let subscription = cell.subscribe(|_| {});
        drop(cell);
        subscription.unsubscribe();
    }

    #[test]
    fn cell_recovers_after_poison_without_panic() {
        let cell = ObservableCell::new("numbers", vec![4]);
        poison_value_lock(&cell);

        assert_eq!(cell.get(), vec![4]);
        cell.set(vec![5, 6]);
        assert_eq!(*cell.snapshot(), vec![5, 6]);
    }
}
