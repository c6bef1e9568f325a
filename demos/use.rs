use avl_set::AvlTreeSet;

fn main() {
    let mut set = AvlTreeSet::new();
    for x in [5, 3, 8, 1, 4, 7, 9] {
        set.insert(x);
    }
    assert!(set.contains(&4));
    set.remove(&4);
    assert!(!set.contains(&4));

    print!("{{ ");
    for x in &set {
        print!("{x}, ");
    }
    println!("}}");

    let mut cursor = set.lower_bound(&6);
    println!("first value >= 6: {:?}", cursor.get());
    cursor.move_prev();
    println!("value before that: {:?}", cursor.get());

    let evens = AvlTreeSet::from([2, 4, 6, 8]);
    let common: Vec<i32> = set.intersection(&evens).copied().collect();
    println!("in both sets: {common:?}");
}
