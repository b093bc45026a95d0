use slotmap::new_key_type;

new_key_type! {
    /// Identifies a passenger for its whole lifetime: on the grid, in
    /// transit, in the waiting queue, or boarded.
    pub struct PassengerId;

    /// Identifies a tunnel placed on the grid.
    pub struct TunnelId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn passenger_ids_are_distinct() {
        let mut sm = SlotMap::<PassengerId, ()>::with_key();
        let a = sm.insert(());
        let b = sm.insert(());
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_stable_across_unrelated_removals() {
        let mut sm = SlotMap::<PassengerId, u32>::with_key();
        let a = sm.insert(1);
        let b = sm.insert(2);
        sm.remove(a);
        assert_eq!(sm[b], 2);
    }
}
