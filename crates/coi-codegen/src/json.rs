//! `Json.parse` support.
//!
//! When a program parses JSON, the emitted source gets a small scanning
//! runtime in `namespace json` plus one `json::parse_at<T>` specialization
//! per data type. Scalar and nested data fields are filled when present;
//! missing or mistyped fields keep their default value.

use coi_parser::ast::{DataDef, Program};

use crate::lower::{cpp_base_type, LowerCtx};

const RUNTIME: &str = r#"namespace json {

inline uint32_t skip_ws(const char* s, uint32_t p, uint32_t len) {
    while (p < len && (s[p] == ' ' || s[p] == '\t' || s[p] == '\n' || s[p] == '\r')) p++;
    return p;
}

inline uint32_t skip_string(const char* s, uint32_t p, uint32_t len) {
    p++;
    while (p < len && s[p] != '"') { if (s[p] == '\\') p++; p++; }
    return p + 1;
}

// Position of the value for a top-level key, or 0 when absent.
inline uint32_t find_key(const char* s, uint32_t len, const char* key, uint32_t klen) {
    uint32_t p = skip_ws(s, 0, len);
    if (p >= len || s[p] != '{') return 0;
    p++;
    int depth = 0;
    while (p < len) {
        char c = s[p];
        if (c == '{' || c == '[') { depth++; p++; continue; }
        if (c == '}' || c == ']') { if (depth == 0) return 0; depth--; p++; continue; }
        if (c != '"') { p++; continue; }
        uint32_t start = p + 1;
        p = skip_string(s, p, len);
        if (depth > 0 || p - start - 1 != klen) continue;
        bool same = true;
        for (uint32_t i = 0; i < klen && same; i++) same = s[start + i] == key[i];
        if (!same) continue;
        p = skip_ws(s, p, len);
        if (p < len && s[p] == ':') return skip_ws(s, p + 1, len);
    }
    return 0;
}

// End of the object or array starting at p, or 0 when unbalanced.
inline uint32_t object_end(const char* s, uint32_t p, uint32_t len) {
    if (p >= len || (s[p] != '{' && s[p] != '[')) return 0;
    int depth = 0;
    while (p < len) {
        char c = s[p];
        if (c == '"') { p = skip_string(s, p, len); continue; }
        if (c == '{' || c == '[') depth++;
        if (c == '}' || c == ']') { depth--; if (depth == 0) return p + 1; }
        p++;
    }
    return 0;
}

inline bool is_null(const char* s, uint32_t p, uint32_t len) {
    return p + 4 <= len && s[p] == 'n' && s[p + 1] == 'u' && s[p + 2] == 'l' && s[p + 3] == 'l';
}

inline webcc::string ext_str(const char* s, uint32_t p, uint32_t len) {
    webcc::string r;
    if (p >= len || s[p] != '"') return r;
    p++;
    while (p < len && s[p] != '"') {
        if (s[p] == '\\' && p + 1 < len) {
            p++;
            switch (s[p]) {
                case 'n': r += '\n'; break;
                case 'r': r += '\r'; break;
                case 't': r += '\t'; break;
                default: r += s[p]; break;
            }
        } else {
            r += s[p];
        }
        p++;
    }
    return r;
}

inline int32_t ext_int(const char* s, uint32_t p, uint32_t len, bool& ok) {
    ok = false;
    bool neg = p < len && s[p] == '-';
    if (neg) p++;
    if (p >= len || s[p] < '0' || s[p] > '9') return 0;
    int32_t r = 0;
    while (p < len && s[p] >= '0' && s[p] <= '9') r = r * 10 + (s[p++] - '0');
    ok = true;
    return neg ? -r : r;
}

inline double ext_float(const char* s, uint32_t p, uint32_t len, bool& ok) {
    ok = false;
    bool neg = p < len && s[p] == '-';
    if (neg) p++;
    if (p >= len || s[p] < '0' || s[p] > '9') return 0;
    double r = 0;
    while (p < len && s[p] >= '0' && s[p] <= '9') r = r * 10 + (s[p++] - '0');
    if (p < len && s[p] == '.') {
        p++;
        double scale = 10;
        while (p < len && s[p] >= '0' && s[p] <= '9') { r += (s[p++] - '0') / scale; scale *= 10; }
    }
    ok = true;
    return neg ? -r : r;
}

inline bool ext_bool(const char* s, uint32_t p, uint32_t len, bool& ok) {
    ok = true;
    if (p + 4 <= len && s[p] == 't' && s[p + 1] == 'r' && s[p + 2] == 'u' && s[p + 3] == 'e') return true;
    if (p + 5 <= len && s[p] == 'f' && s[p + 1] == 'a' && s[p + 2] == 'l' && s[p + 3] == 's' && s[p + 4] == 'e') return false;
    ok = false;
    return false;
}

template<typename T> T parse_at(const char* s, uint32_t len);

template<typename T> T parse(const webcc::string& src) {
    return parse_at<T>(src.data(), src.length());
}

} // namespace json
"#;

/// The scanning runtime shared by every specialization.
pub fn emit_runtime() -> String {
    RUNTIME.to_string()
}

/// One `parse_at` specialization per data type: global types first, then
/// component-local ones. All are declared before any is defined so nested
/// types may appear in any order.
pub fn emit_parsers(program: &Program) -> String {
    let mut types: Vec<(String, &DataDef, LowerCtx)> = Vec::new();
    let global = LowerCtx::new(program, None);
    for data in &program.data {
        types.push((data.name.clone(), data, global));
    }
    for comp in &program.components {
        let ctx = LowerCtx::new(program, Some(comp));
        for data in &comp.data {
            types.push((cpp_base_type(&data.name, &ctx), data, ctx));
        }
    }

    let mut out = String::from("namespace json {\n");
    for (name, _, _) in &types {
        out.push_str(&format!(
            "template<> {name} parse_at<{name}>(const char* s, uint32_t len);\n"
        ));
    }
    for (name, data, ctx) in &types {
        out.push_str(&emit_parser(name, data, ctx));
    }
    out.push_str("} // namespace json\n");
    out
}

fn emit_parser(name: &str, data: &DataDef, ctx: &LowerCtx) -> String {
    let mut out = format!("template<> {name} parse_at<{name}>(const char* s, uint32_t len) {{\n");
    out.push_str(&format!("    {name} r{{}};\n"));
    out.push_str("    bool ok = false;\n");
    out.push_str("    (void)ok;\n");

    for field in &data.fields {
        let key = &field.name;
        let read = match field.ty.as_str() {
            "string" => format!("if (!is_null(s, p, len)) r.{key} = ext_str(s, p, len);"),
            "int" => format!("{{ int32_t v = ext_int(s, p, len, ok); if (ok) r.{key} = v; }}"),
            "float" | "float32" => {
                format!("{{ double v = ext_float(s, p, len, ok); if (ok) r.{key} = v; }}")
            }
            "bool" => format!("{{ bool v = ext_bool(s, p, len, ok); if (ok) r.{key} = v; }}"),
            ty if is_data_type(ty, ctx) => {
                let nested = cpp_base_type(ty, ctx);
                format!(
                    "if (uint32_t end = object_end(s, p, len)) r.{key} = parse_at<{nested}>(s + p, end - p);"
                )
            }
            _ => continue,
        };
        out.push_str(&format!(
            "    if (uint32_t p = find_key(s, len, \"{key}\", {})) {read}\n",
            key.len()
        ));
    }

    out.push_str("    return r;\n}\n");
    out
}

fn is_data_type(ty: &str, ctx: &LowerCtx) -> bool {
    ctx.program.data.iter().any(|d| d.name == ty)
        || ctx
            .component
            .is_some_and(|comp| comp.data.iter().any(|d| d.name == ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_parser::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_runtime_declares_parse_entry_point() {
        let runtime = emit_runtime();
        assert!(runtime.starts_with("namespace json {"));
        assert!(runtime.contains("template<typename T> T parse(const webcc::string& src)"));
        assert!(runtime.ends_with("} // namespace json\n"));
    }

    #[test]
    fn test_parser_per_data_type() {
        let program = Parser::parse(
            r#"
            data Owner { string name; }
            data Pet { int age; float weight; bool good; Owner owner; }
            "#,
        )
        .unwrap();
        let out = emit_parsers(&program);
        assert_eq!(
            out,
            [
                "namespace json {",
                "template<> Owner parse_at<Owner>(const char* s, uint32_t len);",
                "template<> Pet parse_at<Pet>(const char* s, uint32_t len);",
                "template<> Owner parse_at<Owner>(const char* s, uint32_t len) {",
                "    Owner r{};",
                "    bool ok = false;",
                "    (void)ok;",
                "    if (uint32_t p = find_key(s, len, \"name\", 4)) if (!is_null(s, p, len)) r.name = ext_str(s, p, len);",
                "    return r;",
                "}",
                "template<> Pet parse_at<Pet>(const char* s, uint32_t len) {",
                "    Pet r{};",
                "    bool ok = false;",
                "    (void)ok;",
                "    if (uint32_t p = find_key(s, len, \"age\", 3)) { int32_t v = ext_int(s, p, len, ok); if (ok) r.age = v; }",
                "    if (uint32_t p = find_key(s, len, \"weight\", 6)) { double v = ext_float(s, p, len, ok); if (ok) r.weight = v; }",
                "    if (uint32_t p = find_key(s, len, \"good\", 4)) { bool v = ext_bool(s, p, len, ok); if (ok) r.good = v; }",
                "    if (uint32_t p = find_key(s, len, \"owner\", 5)) if (uint32_t end = object_end(s, p, len)) r.owner = parse_at<Owner>(s + p, end - p);",
                "    return r;",
                "}",
                "} // namespace json",
                "",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_component_local_types_are_prefixed() {
        let program =
            Parser::parse("component App { data Item { int id; } }").unwrap();
        let out = emit_parsers(&program);
        assert!(out.contains("template<> App_Item parse_at<App_Item>(const char* s, uint32_t len) {"));
    }
}
