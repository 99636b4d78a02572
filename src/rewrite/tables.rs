//! Static rewrite tables.
//!
//! Each table backs one pipeline stage in the rewrite engine. Regexes are
//! compiled once via `LazyLock`. Package patterns target disjoint
//! namespaces, so their application order does not matter; class renames
//! are consulted exact-match first, then by prefix.

use regex::Regex;
use std::sync::LazyLock;

/// Import-line package substitutions: javax → jakarta families, Apache
/// Commons renames, REST Assured, and the ObjectGraph test rule move.
pub static PACKAGE_MIGRATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"import javax\.inject\.", "import jakarta.inject."),
        (r"import javax\.ws\.rs\.", "import jakarta.ws.rs."),
        (r"import javax\.xml\.bind\.", "import jakarta.xml.bind."),
        (r"import javax\.annotation\.", "import jakarta.annotation."),
        (r"import javax\.servlet\.", "import jakarta.servlet."),
        (
            r"import org\.apache\.commons\.lang\.",
            "import org.apache.commons.lang3.",
        ),
        (
            r"import org\.apache\.commons\.collections\.",
            "import org.apache.commons.collections4.",
        ),
        (r"import com\.jayway\.restassured\.", "import io.restassured."),
        (
            r"import com\.intershop\.beehive\.objectgraph\.guice\.test\.",
            "import com.intershop.platform.objectgraph.testrule.",
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

/// Static-import substitutions, applied only to import lines still in
/// the `org.junit.jupiter` namespace.
pub static STATIC_IMPORT_MIGRATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"^import static\s+org\.junit\.jupiter\.api\.Assertions\.",
            "import static org.junit.Assert.",
        ),
        (
            r"^import static\s+org\.junit\.jupiter\.api\.Assumptions\.",
            "import static org.junit.Assume.",
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

/// Fully-qualified class renames applied to import statements. Exact
/// matches win; a prefix match carries the remaining suffix so nested
/// names under a renamed outer class follow it.
pub const CLASS_MIGRATIONS: &[(&str, &str)] = &[
    // JUnit 5 → JUnit 4 annotations
    ("org.junit.jupiter.api.Test", "org.junit.Test"),
    ("org.junit.jupiter.api.BeforeEach", "org.junit.Before"),
    ("org.junit.jupiter.api.AfterEach", "org.junit.After"),
    ("org.junit.jupiter.api.BeforeAll", "org.junit.BeforeClass"),
    ("org.junit.jupiter.api.AfterAll", "org.junit.AfterClass"),
    ("org.junit.jupiter.api.Disabled", "org.junit.Ignore"),
    (
        "org.junit.jupiter.api.extension.ExtendWith",
        "org.junit.runner.RunWith",
    ),
    (
        "org.junit.jupiter.api.extension.RegisterExtension",
        "org.junit.rules.TestName",
    ),
    // JUnit 5 → JUnit 4 assertions and assumptions
    ("org.junit.jupiter.api.Assertions", "org.junit.Assert"),
    ("org.junit.jupiter.api.Assumptions", "org.junit.Assume"),
    (
        "org.hamcrest.MatcherAssert.assertThat",
        "org.junit.Assert.assertThat",
    ),
    // Mockito runner moves
    (
        "org.mockito.runners.MockitoJUnitRunner",
        "org.mockito.junit.jupiter.MockitoExtension",
    ),
    (
        "org.mockito.junit.MockitoJUnitRunner",
        "org.mockito.junit.jupiter.MockitoExtension",
    ),
    // Intershop-specific moves
    (
        "com.intershop.sellside.rest.common.patch.PATCH",
        "jakarta.ws.rs.PATCH",
    ),
    (
        "com.intershop.sellside.rest.common.v1.capi.resourceobject.common.MoneyRO",
        "com.intershop.component.rest.resources.v1.capi.resourceobject.MoneyRO",
    ),
    (
        "com.intershop.soennecken.sellside.rest.basket.v1.capi.request.basket.BasketItemGetRequest",
        "com.intershop.sellside.rest.basket.v1.capi.request.basket.BasketItemGetRequest",
    ),
    (
        "com.intershop.beehive.orm.internal.jdbc.JDBCConnection",
        "com.intershop.beehive.orm.capi.jdbc.JDBCConnection",
    ),
    (
        "com.intershop.beehive.core.internal.process.xml.Chain",
        "com.intershop.xsd.processchain.v1.Chain",
    ),
];

/// Simple annotation renames, matched only when bounded by whitespace on
/// the left and whitespace or `(` on the right.
pub static ANNOTATION_MIGRATIONS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    [
        ("@BeforeEach", "@Before"),
        ("@AfterEach", "@After"),
        ("@BeforeAll", "@BeforeClass"),
        ("@AfterAll", "@AfterClass"),
        ("@Disabled", "@Ignore"),
        ("@ExtendWith", "@RunWith"),
        ("@RegisterExtension", "@Rule"),
    ]
    .into_iter()
    .map(|(from, to)| {
        let pattern = format!(r"(\s){}([\s(])", regex::escape(from));
        (Regex::new(&pattern).unwrap(), format!("${{1}}{to}${{2}}"))
    })
    .collect()
});

/// Call-site token renames for framework API changes.
pub static METHOD_MIGRATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bverifyZeroInteractions\s*\(", "verifyNoInteractions("),
        (
            r"\bMockitoAnnotations\.initMocks\(",
            "MockitoAnnotations.openMocks(",
        ),
        (r"\bAssertions\.assert", "Assert.assert"),
        (r"\bAssumptions\.assume", "Assume.assume"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

/// Look up a fully-qualified class rename: exact match first, then the
/// longest applicable prefix with the suffix carried over.
pub fn lookup_class_migration(fq_name: &str) -> Option<String> {
    for (from, to) in CLASS_MIGRATIONS {
        if fq_name == *from {
            return Some((*to).to_string());
        }
    }
    for (from, to) in CLASS_MIGRATIONS {
        if let Some(suffix) = fq_name.strip_prefix(from) {
            if suffix.starts_with('.') {
                return Some(format!("{to}{suffix}"));
            }
        }
    }
    None
}
