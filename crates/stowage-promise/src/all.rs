//! The `all` combinator.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::promise::{Next, Promise, Reason, Value};
use crate::scheduler::Scheduler;

/// Result slots for one `all` call.
struct Tally<T> {
    results: Vec<Option<T>>,
    outstanding: usize,
}

impl Scheduler {
    /// Wait for every member and fulfil with their values in input order.
    ///
    /// Bare values count as already fulfilled. The first rejection rejects the
    /// aggregate; later settlements of other members are observed but ignored,
    /// and nothing is cancelled. Progress from any member is forwarded to the
    /// aggregate while it is pending. An empty input fulfils immediately with an
    /// empty vector.
    pub fn all<T: Value, E: Reason>(
        &self,
        members: impl IntoIterator<Item = Next<T, E>>,
    ) -> Promise<Vec<T>, E> {
        stowage_core::profile_function!();
        let members: Vec<Promise<T, E>> = members
            .into_iter()
            .map(|member| match member {
                Next::Value(value) => self.resolved(value),
                Next::Promise(promise) => promise,
            })
            .collect();

        let aggregate = self.defer::<Vec<T>, E>();
        if members.is_empty() {
            aggregate.resolve(Vec::new());
            return aggregate.promise();
        }

        let tally = Rc::new(RefCell::new(Tally {
            results: (0..members.len()).map(|_| None).collect(),
            outstanding: members.len(),
        }));

        for (index, member) in members.iter().enumerate() {
            let tally = Rc::clone(&tally);
            let on_settle = aggregate.clone();
            let on_progress = aggregate.clone();
            member.observe(
                move |outcome| match outcome {
                    Ok(value) => {
                        let finished: Option<Vec<T>> = {
                            let mut tally = tally.borrow_mut();
                            if tally.results[index].is_some() {
                                return;
                            }
                            tally.results[index] = Some(value);
                            tally.outstanding -= 1;
                            if tally.outstanding == 0 {
                                Some(tally.results.iter_mut().filter_map(Option::take).collect())
                            } else {
                                None
                            }
                        };
                        if let Some(values) = finished {
                            on_settle.resolve(values);
                        }
                    }
                    Err(reason) => on_settle.reject(reason),
                },
                move |progress| on_progress.notify(progress),
            );
        }

        aggregate.promise()
    }

    /// Keyed form of [`all`](Self::all): the result map keeps the input keys and order.
    pub fn all_keyed<K, T, E>(&self, members: IndexMap<K, Next<T, E>>) -> Promise<IndexMap<K, T>, E>
    where
        K: Hash + Eq + Clone + 'static,
        T: Value,
        E: Reason,
    {
        let (keys, members): (Vec<K>, Vec<Next<T, E>>) = members.into_iter().unzip();
        self.all(members)
            .map(move |values| keys.into_iter().zip(values).collect())
    }
}
