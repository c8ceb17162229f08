//
// builtins.rs
//
// Export tables for the built-in `sass:*` modules
//

use tower_lsp::lsp_types::Url;

use crate::cross_file::types::SymbolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinExport {
    /// `$name` for variables, bare for functions and mixins
    pub name: &'static str,
    pub kind: SymbolKind,
    pub signature: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinModule {
    /// Module name without the `sass:` scheme
    pub name: &'static str,
    pub description: &'static str,
    pub exports: &'static [BuiltinExport],
}

impl BuiltinModule {
    pub fn find(&self, name: &str, kind: SymbolKind) -> Option<&'static BuiltinExport> {
        self.exports
            .iter()
            .find(|export| export.kind == kind && export.name == name)
    }

    pub fn exports_of(&self, kind: SymbolKind) -> impl Iterator<Item = &'static BuiltinExport> {
        self.exports.iter().filter(move |export| export.kind == kind)
    }

    pub fn identity(&self) -> String {
        format!("sass:{}", self.name)
    }
}

const fn function(
    name: &'static str,
    signature: &'static str,
    description: &'static str,
) -> BuiltinExport {
    BuiltinExport {
        name,
        kind: SymbolKind::Function,
        signature,
        description,
    }
}

const fn variable(name: &'static str, signature: &'static str, description: &'static str) -> BuiltinExport {
    BuiltinExport {
        name,
        kind: SymbolKind::Variable,
        signature,
        description,
    }
}

const fn mixin(name: &'static str, signature: &'static str, description: &'static str) -> BuiltinExport {
    BuiltinExport {
        name,
        kind: SymbolKind::Mixin,
        signature,
        description,
    }
}

const MATH: &[BuiltinExport] = &[
    variable("$e", "$e", "The value of the mathematical constant e."),
    variable("$pi", "$pi", "The value of the mathematical constant π."),
    variable("$epsilon", "$epsilon", "The difference between 1 and the smallest double greater than 1."),
    variable("$max-safe-integer", "$max-safe-integer", "The maximum integer n such that n and n + 1 are both precisely representable."),
    variable("$min-safe-integer", "$min-safe-integer", "The minimum integer n such that n and n - 1 are both precisely representable."),
    variable("$max-number", "$max-number", "The maximum finite number that can be represented."),
    variable("$min-number", "$min-number", "The smallest positive number that can be represented."),
    function("ceil", "ceil($number)", "Rounds up to the nearest whole number."),
    function("clamp", "clamp($min, $number, $max)", "Restricts $number to the range between $min and $max."),
    function("floor", "floor($number)", "Rounds down to the nearest whole number."),
    function("max", "max($number...)", "Returns the highest of one or more numbers."),
    function("min", "min($number...)", "Returns the lowest of one or more numbers."),
    function("round", "round($number)", "Rounds to the nearest whole number."),
    function("abs", "abs($number)", "Returns the absolute value of $number."),
    function("hypot", "hypot($number...)", "Returns the length of the n-dimensional vector with the given components."),
    function("log", "log($number, $base: null)", "Returns the logarithm of $number with respect to $base."),
    function("pow", "pow($base, $exponent)", "Raises $base to the power of $exponent."),
    function("sqrt", "sqrt($number)", "Returns the square root of $number."),
    function("cos", "cos($number)", "Returns the cosine of $number."),
    function("sin", "sin($number)", "Returns the sine of $number."),
    function("tan", "tan($number)", "Returns the tangent of $number."),
    function("acos", "acos($number)", "Returns the arccosine of $number in deg."),
    function("asin", "asin($number)", "Returns the arcsine of $number in deg."),
    function("atan", "atan($number)", "Returns the arctangent of $number in deg."),
    function("atan2", "atan2($y, $x)", "Returns the 2-argument arctangent of $y and $x in deg."),
    function("compatible", "compatible($number1, $number2)", "Returns whether the units of the two numbers can be converted."),
    function("is-unitless", "is-unitless($number)", "Returns whether $number has no units."),
    function("unit", "unit($number)", "Returns a string representation of the units of $number."),
    function("div", "div($number1, $number2)", "Returns the result of dividing $number1 by $number2."),
    function("percentage", "percentage($number)", "Converts a unitless number to a percentage."),
    function("random", "random($limit: null)", "Returns a random number, optionally an integer between 1 and $limit."),
];

const COLOR: &[BuiltinExport] = &[
    function("adjust", "adjust($color, $red: null, $green: null, $blue: null, $hue: null, $saturation: null, $lightness: null, $whiteness: null, $blackness: null, $alpha: null, $space: null)", "Increases or decreases one or more properties of $color by fixed amounts."),
    function("change", "change($color, $red: null, $green: null, $blue: null, $hue: null, $saturation: null, $lightness: null, $whiteness: null, $blackness: null, $alpha: null, $space: null)", "Sets one or more properties of $color to new values."),
    function("scale", "scale($color, $red: null, $green: null, $blue: null, $saturation: null, $lightness: null, $whiteness: null, $blackness: null, $alpha: null, $space: null)", "Fluidly scales one or more properties of $color."),
    function("mix", "mix($color1, $color2, $weight: 50%, $method: null)", "Returns a color that is a mixture of $color1 and $color2."),
    function("complement", "complement($color, $space: null)", "Returns the RGB complement of $color."),
    function("grayscale", "grayscale($color)", "Returns a gray color with the same lightness as $color."),
    function("invert", "invert($color, $weight: 100%, $space: null)", "Returns the inverse or negative of $color."),
    function("ie-hex-str", "ie-hex-str($color)", "Returns an unquoted string representing $color in #AARRGGBB format."),
    function("alpha", "alpha($color)", "Returns the alpha channel of $color as a number between 0 and 1."),
    function("red", "red($color)", "Returns the red channel of $color as a number between 0 and 255."),
    function("green", "green($color)", "Returns the green channel of $color as a number between 0 and 255."),
    function("blue", "blue($color)", "Returns the blue channel of $color as a number between 0 and 255."),
    function("hue", "hue($color)", "Returns the hue of $color as a number between 0deg and 360deg."),
    function("saturation", "saturation($color)", "Returns the HSL saturation of $color as a number between 0% and 100%."),
    function("lightness", "lightness($color)", "Returns the HSL lightness of $color as a number between 0% and 100%."),
    function("whiteness", "whiteness($color)", "Returns the HWB whiteness of $color as a number between 0% and 100%."),
    function("blackness", "blackness($color)", "Returns the HWB blackness of $color as a number between 0% and 100%."),
    function("hwb", "hwb($hue, $whiteness, $blackness, $alpha: 1)", "Returns a color with the given hue, whiteness, and blackness."),
    function("channel", "channel($color, $channel, $space: null)", "Returns the value of $channel in $space."),
    function("space", "space($color)", "Returns the name of the color space of $color."),
    function("to-space", "to-space($color, $space)", "Converts $color into the given color space."),
    function("is-legacy", "is-legacy($color)", "Returns whether $color is in a legacy color space."),
    function("is-missing", "is-missing($color, $channel)", "Returns whether $channel is missing in $color."),
    function("is-in-gamut", "is-in-gamut($color, $space: null)", "Returns whether $color is in the gamut of $space."),
    function("to-gamut", "to-gamut($color, $space: null, $method)", "Returns a visually similar color within the gamut of $space."),
    function("same", "same($color1, $color2)", "Returns whether the two colors visually render as the same color."),
    function("is-powerless", "is-powerless($color, $channel, $space: null)", "Returns whether $channel is powerless in $space."),
];

const STRING: &[BuiltinExport] = &[
    function("quote", "quote($string)", "Returns $string as a quoted string."),
    function("unquote", "unquote($string)", "Returns $string as an unquoted string."),
    function("index", "index($string, $substring)", "Returns the first index of $substring in $string, or null."),
    function("insert", "insert($string, $insert, $index)", "Returns a copy of $string with $insert inserted at $index."),
    function("length", "length($string)", "Returns the number of characters in $string."),
    function("slice", "slice($string, $start-at, $end-at: -1)", "Returns the slice of $string between $start-at and $end-at."),
    function("split", "split($string, $separator, $limit: null)", "Returns a bracketed, comma-separated list of substrings of $string."),
    function("to-upper-case", "to-upper-case($string)", "Returns a copy of $string with ASCII letters converted to upper case."),
    function("to-lower-case", "to-lower-case($string)", "Returns a copy of $string with ASCII letters converted to lower case."),
    function("unique-id", "unique-id()", "Returns a randomly generated unquoted string that is a valid CSS identifier."),
];

const LIST: &[BuiltinExport] = &[
    function("append", "append($list, $val, $separator: auto)", "Returns a copy of $list with $val added to the end."),
    function("index", "index($list, $value)", "Returns the index of $value in $list, or null."),
    function("is-bracketed", "is-bracketed($list)", "Returns whether $list has square brackets."),
    function("join", "join($list1, $list2, $separator: auto, $bracketed: auto)", "Returns a new list containing the elements of $list1 followed by those of $list2."),
    function("length", "length($list)", "Returns the length of $list."),
    function("separator", "separator($list)", "Returns the name of the separator used by $list."),
    function("nth", "nth($list, $n)", "Returns the element of $list at index $n."),
    function("set-nth", "set-nth($list, $n, $value)", "Returns a copy of $list with the element at index $n replaced with $value."),
    function("slash", "slash($elements...)", "Returns a slash-separated list that contains $elements."),
    function("zip", "zip($lists...)", "Combines every list in $lists into a single list of sub-lists."),
];

const MAP: &[BuiltinExport] = &[
    function("deep-merge", "deep-merge($map1, $map2)", "Like merge, but nested maps are merged recursively."),
    function("deep-remove", "deep-remove($map, $key, $keys...)", "Returns a copy of $map without the value at the given key path."),
    function("get", "get($map, $key, $keys...)", "Returns the value in $map associated with $key."),
    function("has-key", "has-key($map, $key, $keys...)", "Returns whether $map contains a value associated with $key."),
    function("keys", "keys($map)", "Returns a comma-separated list of all the keys in $map."),
    function("merge", "merge($map1, $args...)", "Returns a new map with all the keys and values from both maps."),
    function("remove", "remove($map, $keys...)", "Returns a copy of $map without any values associated with $keys."),
    function("set", "set($map, $key, $keys..., $value)", "Returns a copy of $map with the value at the key path set to $value."),
    function("values", "values($map)", "Returns a comma-separated list of all the values in $map."),
];

const SELECTOR: &[BuiltinExport] = &[
    function("is-superselector", "is-superselector($super, $sub)", "Returns whether $super matches all the elements $sub matches."),
    function("append", "append($selectors...)", "Combines $selectors without descendant combinators."),
    function("extend", "extend($selector, $extendee, $extender)", "Extends $selector as with the @extend rule."),
    function("nest", "nest($selectors...)", "Combines $selectors as though they were nested within one another."),
    function("parse", "parse($selector)", "Returns $selector in the selector value format."),
    function("replace", "replace($selector, $original, $replacement)", "Returns a copy of $selector with all instances of $original replaced."),
    function("unify", "unify($selector1, $selector2)", "Returns a selector that matches only elements matched by both selectors."),
    function("simple-selectors", "simple-selectors($selector)", "Returns a list of the simple selectors in a compound selector."),
];

const META: &[BuiltinExport] = &[
    mixin("load-css", "load-css($url, $with: null)", "Loads the module at $url and includes its CSS as though it were written as this mixin's contents."),
    mixin("apply", "apply($mixin, $args...)", "Includes $mixin with $args."),
    function("accepts-content", "accepts-content($mixin)", "Returns whether the given mixin value can accept a content block."),
    function("calc-args", "calc-args($calc)", "Returns the arguments for the given calculation."),
    function("calc-name", "calc-name($calc)", "Returns the name of the given calculation."),
    function("call", "call($function, $args...)", "Invokes $function with $args and returns the result."),
    function("content-exists", "content-exists()", "Returns whether the current mixin was passed a content block."),
    function("feature-exists", "feature-exists($feature)", "Returns whether the current Sass implementation supports $feature."),
    function("function-exists", "function-exists($name, $module: null)", "Returns whether a function named $name is defined."),
    function("get-function", "get-function($name, $css: false, $module: null)", "Returns the function value named $name."),
    function("get-mixin", "get-mixin($name, $module: null)", "Returns the mixin value named $name."),
    function("global-variable-exists", "global-variable-exists($name, $module: null)", "Returns whether a global variable named $name exists."),
    function("inspect", "inspect($value)", "Returns a string representation of $value."),
    function("keywords", "keywords($args)", "Returns the keywords passed to a mixin or function that takes arbitrary arguments."),
    function("mixin-exists", "mixin-exists($name, $module: null)", "Returns whether a mixin named $name exists."),
    function("module-functions", "module-functions($module)", "Returns all the functions defined in a module."),
    function("module-mixins", "module-mixins($module)", "Returns all the mixins defined in a module."),
    function("module-variables", "module-variables($module)", "Returns all the variables defined in a module."),
    function("type-of", "type-of($value)", "Returns the type of $value."),
    function("variable-exists", "variable-exists($name)", "Returns whether a variable named $name exists in the current scope."),
];

pub const BUILTIN_MODULES: &[BuiltinModule] = &[
    BuiltinModule {
        name: "math",
        description: "Functions that operate on numbers.",
        exports: MATH,
    },
    BuiltinModule {
        name: "color",
        description: "Functions that create and inspect colors.",
        exports: COLOR,
    },
    BuiltinModule {
        name: "string",
        description: "Functions that combine, search, or split strings.",
        exports: STRING,
    },
    BuiltinModule {
        name: "list",
        description: "Functions that read and modify lists.",
        exports: LIST,
    },
    BuiltinModule {
        name: "map",
        description: "Functions that look up values in maps.",
        exports: MAP,
    },
    BuiltinModule {
        name: "selector",
        description: "Functions that inspect and manipulate selectors.",
        exports: SELECTOR,
    },
    BuiltinModule {
        name: "meta",
        description: "Mixins and functions that expose the inner workings of Sass.",
        exports: META,
    },
];

/// Look up a module by bare name (`math`).
pub fn module(name: &str) -> Option<&'static BuiltinModule> {
    BUILTIN_MODULES.iter().find(|m| m.name == name)
}

/// Look up the module behind a `sass:<name>` identity.
pub fn module_for_target(target: &Url) -> Option<&'static BuiltinModule> {
    if target.scheme() != "sass" {
        return None;
    }
    module(target.path())
}
