#[macro_export]
macro_rules! tree {
    ($e:expr) => {
        $crate::tree::tree_parser::from_newick($e)
            .unwrap()
            .pop()
            .unwrap()
    };
}

#[macro_export]
macro_rules! seeded_rng {
    () => {
        <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(42)
    };
    ($seed:expr) => {
        <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64($seed)
    };
}
