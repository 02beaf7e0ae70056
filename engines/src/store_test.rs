#[cfg(test)]
mod tests {
    use crate::store::StoreEngine;
    use reactbench_core::{Field, Instance, Mutation, ReactiveEngine, Subscription, Tracker};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(
        instance: &Rc<dyn Instance>,
        read: impl Fn(&dyn Tracker) -> i64 + 'static,
    ) -> (Subscription, Rc<RefCell<Vec<i64>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sub = instance.subscribe(Box::new(move |t: &dyn Tracker| log.borrow_mut().push(read(t))));
        (sub, seen)
    }

    #[test]
    fn test_listener_not_called_on_subscribe() {
        let instance = StoreEngine.create(0);
        let (_sub, seen) = record(&instance, |t| t.get(Field::A));
        assert!(seen.borrow().is_empty());
        assert_eq!(instance.subscriber_count(), 1);
    }

    #[test]
    fn test_update_notifies_once_with_new_state() {
        let instance = StoreEngine.create(0);
        let (_sub, seen) = record(&instance, |t| t.get(Field::A) + t.get(Field::B));
        instance.mutate(Mutation::Update);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_listeners_are_coarse() {
        let instance = StoreEngine.create(0);
        let (_sub, seen) = record(&instance, |t| t.get(Field::B));
        instance.mutate(Mutation::UpdateC);
        instance.mutate(Mutation::UpdateA);
        assert_eq!(*seen.borrow(), vec![0, 0]);
    }

    #[test]
    fn test_every_listener_notified_until_disposed() {
        let instance = StoreEngine.create(0);
        let (mut first, seen_first) = record(&instance, |t| t.get(Field::A));
        let (_second, seen_second) = record(&instance, |t| t.get(Field::A));
        instance.mutate(Mutation::UpdateA);
        first.dispose();
        instance.mutate(Mutation::UpdateA);
        assert_eq!(*seen_first.borrow(), vec![1]);
        assert_eq!(*seen_second.borrow(), vec![1, 2]);
        assert_eq!(instance.subscriber_count(), 1);
    }

    #[test]
    fn test_dispose_from_inside_listener() {
        let instance = StoreEngine.create(0);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(RefCell::new(0));
        let (s, c) = (slot.clone(), calls.clone());
        let sub = instance.subscribe(Box::new(move |_t: &dyn Tracker| {
            *c.borrow_mut() += 1;
            if let Some(mut sub) = s.borrow_mut().take() {
                sub.dispose();
            }
        }));
        *slot.borrow_mut() = Some(sub);
        instance.mutate(Mutation::UpdateA);
        instance.mutate(Mutation::UpdateA);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(instance.subscriber_count(), 0);
    }
}
