//! Document observer registry. Observers see `Changed` events in strict version
//! order, matching the ordering guarantee in the concurrency model: a document is
//! mutated only on the core task, so there is never a race to order against.

use super::edit::{EditOperation, EditSource};

#[derive(Debug, Clone)]
pub struct ChangeEvent {
  pub version: usize,
  pub previous_version: usize,
  pub applied: Vec<EditOperation>,
  pub inverse: Vec<EditOperation>,
  pub source: EditSource,
}

type Observer = Box<dyn FnMut(&ChangeEvent) + 'static>;

/// An opaque handle identifying a registered observer, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

#[derive(Default)]
pub struct ObserverRegistry {
  next_id: u64,
  observers: Vec<(ObserverHandle, Observer)>,
}

impl ObserverRegistry {
  pub fn subscribe(&mut self, observer: impl FnMut(&ChangeEvent) + 'static) -> ObserverHandle {
    let handle = ObserverHandle(self.next_id);
    self.next_id += 1;
    self.observers.push((handle, Box::new(observer)));
    handle
  }

  pub fn unsubscribe(&mut self, handle: ObserverHandle) {
    self.observers.retain(|(h, _)| *h != handle);
  }

  pub fn notify(&mut self, event: &ChangeEvent) {
    for (_, observer) in self.observers.iter_mut() {
      observer(event);
    }
  }
}

impl std::fmt::Debug for ObserverRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ObserverRegistry").field("count", &self.observers.len()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  #[test]
  fn observers_see_versions_in_order() {
    let mut registry = ObserverRegistry::default();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    registry.subscribe(move |event| seen_clone.borrow_mut().push(event.version));

    for v in 1..=3 {
      registry.notify(&ChangeEvent {
        version: v,
        previous_version: v - 1,
        applied: vec![],
        inverse: vec![],
        source: EditSource::User,
      });
    }
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
  }

  #[test]
  fn unsubscribe_stops_delivery() {
    let mut registry = ObserverRegistry::default();
    let count = Rc::new(RefCell::new(0));
    let count_clone = count.clone();
    let handle = registry.subscribe(move |_| *count_clone.borrow_mut() += 1);
    registry.notify(&ChangeEvent { version: 1, previous_version: 0, applied: vec![], inverse: vec![], source: EditSource::User });
    registry.unsubscribe(handle);
    registry.notify(&ChangeEvent { version: 2, previous_version: 1, applied: vec![], inverse: vec![], source: EditSource::User });
    assert_eq!(*count.borrow(), 1);
  }
}
