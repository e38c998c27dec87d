use crate::depth::Depth;

#[test]
fn test_depth_empty() {
    let depth = Depth::new();
    assert_eq!(depth.samples(), 0);
    assert_eq!((depth.min(), depth.mean(), depth.max()), (0, 0, 0));
    assert!(depth.percentiles().is_empty());
    assert_eq!(
        depth.json(),
        "{\"samples\":0,\"min\":0,\"mean\":0,\"max\":0,\"tail\":[]}"
    );
}

#[test]
fn test_depth_sample() {
    let mut depth = Depth::new();
    // ten samples: 3 at depth 2, 6 at depth 3, 1 at depth 5.
    for d in [3, 2, 3, 3, 2, 5, 3, 3, 2, 3].iter() {
        depth.sample(*d);
    }
    assert_eq!(depth.samples(), 10);
    assert_eq!(depth.min(), 2);
    assert_eq!(depth.max(), 5);
    assert_eq!(depth.mean(), 29 / 10);
    assert_eq!(depth.percentiles(), vec![(90, 3), (100, 5)]);
    assert_eq!(
        depth.json(),
        "{\"samples\":10,\"min\":2,\"mean\":2,\"max\":5,\"tail\":[[90,3],[100,5]]}"
    );
}

#[test]
fn test_depth_overflow_bucket() {
    let mut depth = Depth::new();
    depth.sample(1);
    // past the last bucket, counted at depth 255.
    depth.sample(1000);
    assert_eq!(depth.max(), 1000);
    assert_eq!(depth.percentiles(), vec![(100, 255)]);
}
