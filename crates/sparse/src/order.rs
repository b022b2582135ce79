/// Renumbers the per-node payload `front` by postorder rank.
///
/// Node `i` has rank `order[i]`, or `None` if it is not part of the final tree. On return
/// `front[..nfr]` holds the payload of the live nodes by rank; the rest of `front` is left as it
/// was and is up to the caller to drop.
///
/// Every rank must be unique and below `nfr`, and `nfr <= front.len()`.
pub fn apply_order<X: Copy + Default>(front: &mut [X], order: &[Option<usize>], nfr: usize) {
    debug_assert_eq!(front.len(), order.len());
    debug_assert!(nfr <= front.len());

    let mut temp = vec![X::default(); nfr];
    for (&payload, &rank) in front.iter().zip(order) {
        if let Some(k) = rank {
            debug_assert!(k < nfr, "rank {} out of {}", k, nfr);
            temp[k] = payload;
        }
    }
    front[..nfr].copy_from_slice(&temp);
}
