use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Exam labels are free text rendered by the frontend, so markup is stripped
/// on the way in. `<script>` and `<style>` elements are removed together with
/// their content; safe inline tags survive.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
