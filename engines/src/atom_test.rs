#[cfg(test)]
mod tests {
    use crate::atom::AtomEngine;
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
    fn test_create_seeds_fields() {
        let instance = AtomEngine.create(9);
        assert_eq!(instance.get(Field::A), 9);
        assert_eq!(instance.get(Field::B), 0);
        assert_eq!(instance.get(Field::C), 0);
        assert_eq!(instance.subscriber_count(), 0);
    }

    #[test]
    fn test_reaction_runs_on_subscribe_and_batches_update() {
        let instance = AtomEngine.create(0);
        let (_sub, seen) = record(&instance, |t| t.get(Field::A) + t.get(Field::B));
        assert_eq!(*seen.borrow(), vec![0]);

        instance.mutate(Mutation::Update);
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn test_only_observed_fields_trigger() {
        let instance = AtomEngine.create(0);
        let (_sub, seen) = record(&instance, |t| t.get(Field::B));
        instance.mutate(Mutation::UpdateA);
        instance.mutate(Mutation::UpdateC);
        assert_eq!(seen.borrow().len(), 1);
        instance.mutate(Mutation::UpdateB);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_dependencies_are_retracked_each_run() {
        let instance = AtomEngine.create(0);
        let (_sub, seen) = record(&instance, |t| {
            if t.get(Field::B) == 0 { t.get(Field::A) } else { t.get(Field::C) }
        });
        instance.mutate(Mutation::UpdateB);
        assert_eq!(seen.borrow().len(), 2);
        // `a` was dropped from the dependency set, `c` was added.
        instance.mutate(Mutation::UpdateA);
        assert_eq!(seen.borrow().len(), 2);
        instance.mutate(Mutation::UpdateC);
        assert_eq!(*seen.borrow(), vec![0, 0, 1]);
    }

    #[test]
    fn test_dispose_from_inside_reaction() {
        let instance = AtomEngine.create(0);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(RefCell::new(0));
        let (s, c) = (slot.clone(), calls.clone());
        let sub = instance.subscribe(Box::new(move |t: &dyn Tracker| {
            *c.borrow_mut() += 1;
            if t.get(Field::A) == 2 {
                if let Some(mut sub) = s.borrow_mut().take() {
                    sub.dispose();
                }
            }
        }));
        *slot.borrow_mut() = Some(sub);

        instance.mutate(Mutation::UpdateA);
        instance.mutate(Mutation::UpdateA);
        instance.mutate(Mutation::UpdateA);
        assert_eq!(*calls.borrow(), 3);
        assert_eq!(instance.subscriber_count(), 0);
    }

    #[test]
    fn test_mutation_inside_reaction_is_flushed() {
        let instance = AtomEngine.create(0);
        let weak = Rc::downgrade(&instance);
        let _writer = instance.subscribe(Box::new(move |t: &dyn Tracker| {
            if t.get(Field::A) == 1 {
                if let Some(instance) = weak.upgrade() {
                    instance.mutate(Mutation::UpdateB);
                }
            }
        }));
        let (_sub, seen) = record(&instance, |t| t.get(Field::B));
        instance.mutate(Mutation::UpdateA);
        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert_eq!(instance.get(Field::B), 1);
    }

    #[test]
    fn test_drop_disposes_subscription() {
        let instance = AtomEngine.create(0);
        let (sub, seen) = record(&instance, |t| t.get(Field::A));
        assert_eq!(instance.subscriber_count(), 1);
        drop(sub);
        assert_eq!(instance.subscriber_count(), 0);
        instance.mutate(Mutation::UpdateA);
        assert_eq!(seen.borrow().len(), 1);
    }
}
