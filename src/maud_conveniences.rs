use maud::{DOCTYPE, Markup, Render, html};

pub fn page(page_title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8" {}
                meta name="viewport" content="width=device-width, initial-scale=1.0" {}
                script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                title { (page_title) }
            }
            body class="bg-gray-900 min-h-screen flex flex-col items-center p-8 text-white" {
                (body)
            }
        }
    }
}

pub fn render_table<const N: usize>(
    overall_title: impl Render,
    titles: [&'static str; N],
    items: Vec<[Markup; N]>,
) -> Markup {
    html! {
        div class="container mx-auto" {
            (title(overall_title))
            div class="overflow-x-auto" {
                table class="min-w-full bg-gray-800 rounded shadow-md" {
                    thead class="bg-gray-700" {
                        tr {
                            @for title in titles {
                                th class="py-2 px-4 text-left font-semibold text-gray-300" {(title)}
                            }
                        }
                    }
                    tbody {
                        @for row in items {
                            tr {
                                @for col in row {
                                    td class="py-2 px-4 border-b border-gray-600 text-gray-200" {(col)}
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn title(s: impl Render) -> Markup {
    html! {
        h1 class="text-2xl font-semibold mb-4" {(s)}
    }
}

pub fn search_input(name: &str, label: &str, value: Option<&str>) -> Markup {
    html! {
        div class="flex flex-col" {
            label for=(name) class="text-sm font-bold mb-1 text-gray-300" {(label)}
            input type="text" id=(name) name=(name) value=[value] class="shadow appearance-none border rounded py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {}
        }
    }
}
