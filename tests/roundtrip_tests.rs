/// Round-trip tests: canonical query text survives parse -> format
/// unchanged, and any parseable text is stable after one normalization
/// pass.
use cqlkit::CqlQuery;

fn format(text: &str) -> String {
    CqlQuery::parse(text).expect("query must parse").to_text()
}

#[test]
fn test_canonical_queries_are_fixed_points() {
    let queries = [
        "Name:admin",
        "Name:'a b'",
        "Name:'a:b'",
        "Name:''",
        "Name:admin*",
        "Name:admin^2",
        "Name:admin~0.8",
        "Name:admin^2~0.8",
        "+TypeIs:User -Hidden:yes",
        "Name:a Name:b",
        "+TypeIs:User +(Name:a Name:b)",
        "+TypeIs:User +(Name:a +(DisplayName:b Index:1))",
        "Index:[1 TO 10]",
        "Index:{1 TO 10]",
        "Index:[1 TO 10}",
        "Index:{1 TO 10}",
        "Index:>5",
        "Index:>=5",
        "Index:<5",
        "Index:<=5",
        "Index:[1 TO 10]^2",
        "CreationDate:<'2023-01-01 10:00:00'",
        "Name:a .TOP:10 .SKIP:5 .SORT:Name .REVERSESORT:Index .AUTOFILTERS:OFF .LIFESPAN:ON .COUNTONLY .ALLVERSIONS .QUICK",
        "Sharing:a,b,c",
    ];
    for query in queries {
        assert_eq!(format(query), query, "not a fixed point: {}", query);
    }
}

#[test]
fn test_normalization_is_stable() {
    // non-canonical spellings normalize in one pass and stay put
    let cases = [
        ("admin", "_Text:admin"),
        ("+Name:admin", "Name:admin"),
        ("Name:admin^0.5", "Name:admin"),
        ("Name:admin~", "Name:admin"),
        ("  Name:a   Name:b  ", "Name:a Name:b"),
        ("Name:\"plain\"", "Name:plain"),
        ("Index:[ 1 TO 10 ]", "Index:[1 TO 10]"),
    ];
    for (input, expected) in cases {
        let once = format(input);
        assert_eq!(once, expected, "input: {}", input);
        assert_eq!(format(&once), once, "unstable after one pass: {}", input);
    }
}

#[test]
fn test_trees_round_trip_structurally() {
    let queries = [
        "+TypeIs:User +(Name:a Name:b) -Hidden:yes",
        "Index:{1 TO 10] Name:x*",
        "-Name:admin",
    ];
    for query in queries {
        let first = CqlQuery::parse(query).expect("query must parse");
        let reparsed = CqlQuery::parse(&first.to_text()).expect("formatted text must parse");
        assert_eq!(first.tree, reparsed.tree, "tree drift for: {}", query);
    }
}
